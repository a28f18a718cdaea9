use crate::cancel::CancellationSignal;
use crate::engine::{ConversionEngine, ConversionOutcome, ConversionSummary};
use crate::{ConvertResult, Csv2SqlError};
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tracing::info;

/// Progress of a batch, one event at a time. Positions are 1-based.
#[derive(Debug)]
pub enum BatchEvent {
    /// About to convert file `position` of `total`.
    Starting {
        position: usize,
        total: usize,
        source: PathBuf,
    },
    FileCompleted {
        position: usize,
        summary: ConversionSummary,
    },
    /// Stopped on request; `completed` files were fully converted before.
    Cancelled { completed: usize },
    /// Every file converted.
    Finished { files: usize },
}

/// Final state of a batch that did not fail.
#[derive(Debug)]
pub enum BatchOutcome {
    Completed(Vec<ConversionSummary>),
    Cancelled { completed: Vec<ConversionSummary> },
}

/// Runs one engine over an ordered list of source files, sequentially.
pub struct BatchRunner<'a> {
    engine: &'a ConversionEngine,
    destination_dir: PathBuf,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Start(usize),
    Convert(usize),
    Done,
}

struct State<'a, S: ?Sized> {
    engine: &'a ConversionEngine,
    destination_dir: &'a Path,
    sources: Vec<PathBuf>,
    signal: &'a S,
    step: Step,
    completed: usize,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: &'a ConversionEngine, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            destination_dir: destination_dir.into(),
        }
    }

    /// Stream of progress events. Files are processed in the given order; the
    /// stream ends after `Finished`, `Cancelled`, or the first `Err`, which
    /// wraps the failing file's error in `Csv2SqlError::FileFailed`.
    pub fn run<'s, S>(
        &'s self,
        sources: Vec<PathBuf>,
        signal: &'s S,
    ) -> impl Stream<Item = ConvertResult<BatchEvent>> + 's
    where
        S: CancellationSignal + ?Sized,
    {
        let state = State {
            engine: self.engine,
            destination_dir: &self.destination_dir,
            sources,
            signal,
            step: Step::Start(0),
            completed: 0,
        };
        futures::stream::unfold(state, |mut state| async move {
            let step = state.step;
            let event = match step {
                Step::Done => return None,
                Step::Start(_) if state.signal.is_cancelled() => {
                    state.step = Step::Done;
                    info!(completed = state.completed, "batch cancelled");
                    Ok(BatchEvent::Cancelled {
                        completed: state.completed,
                    })
                }
                Step::Start(idx) if idx == state.sources.len() => {
                    state.step = Step::Done;
                    let files = state.sources.len();
                    info!(files, "batch finished");
                    Ok(BatchEvent::Finished { files })
                }
                Step::Start(idx) => {
                    state.step = Step::Convert(idx);
                    Ok(BatchEvent::Starting {
                        position: idx + 1,
                        total: state.sources.len(),
                        source: state.sources[idx].clone(),
                    })
                }
                Step::Convert(idx) => {
                    let source = &state.sources[idx];
                    match state
                        .engine
                        .convert(source, state.destination_dir, state.signal)
                        .await
                    {
                        Ok(ConversionOutcome::Completed(summary)) => {
                            state.completed += 1;
                            state.step = Step::Start(idx + 1);
                            Ok(BatchEvent::FileCompleted {
                                position: idx + 1,
                                summary,
                            })
                        }
                        Ok(ConversionOutcome::Aborted) => {
                            state.step = Step::Done;
                            info!(completed = state.completed, "batch cancelled");
                            Ok(BatchEvent::Cancelled {
                                completed: state.completed,
                            })
                        }
                        Err(e) => {
                            state.step = Step::Done;
                            Err(Csv2SqlError::FileFailed {
                                index: idx + 1,
                                path: source.clone(),
                                source: Box::new(e),
                            })
                        }
                    }
                }
            };
            Some((event, state))
        })
    }

    /// Drive `run` to the end, collecting the summaries of converted files.
    pub async fn run_to_end<S>(
        &self,
        sources: Vec<PathBuf>,
        signal: &S,
    ) -> ConvertResult<BatchOutcome>
    where
        S: CancellationSignal + ?Sized,
    {
        let mut summaries = Vec::new();
        let events = self.run(sources, signal);
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            match event? {
                BatchEvent::Starting { .. } => {}
                BatchEvent::FileCompleted { summary, .. } => summaries.push(summary),
                BatchEvent::Cancelled { .. } => {
                    return Ok(BatchOutcome::Cancelled {
                        completed: summaries,
                    })
                }
                BatchEvent::Finished { .. } => break,
            }
        }
        Ok(BatchOutcome::Completed(summaries))
    }
}

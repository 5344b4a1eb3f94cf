use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::Client;
use crate::error::Error;
use crate::events::{FetchIntent, FetchOutcome, FetchRequest};

/// Executes fetch requests against the collaborator with bounded
/// concurrency and reports completions back to the engine. Failures are
/// folded into outcome events rather than propagated; the engine decides
/// which of them degrade the show.
pub async fn run(
    client: Client,
    mut requests: Receiver<FetchRequest>,
    outcomes: Sender<FetchOutcome>,
    cancel: CancellationToken,
    max_in_flight: usize,
) -> Result<()> {
    let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => break,

            Some(request) = requests.recv(), if tasks.len() < max_in_flight => {
                tasks.spawn(execute(client.clone(), request));
            }

            Some(joined) = tasks.join_next() => match joined {
                Ok(outcome) => {
                    if outcomes.send(outcome).await.is_err() {
                        debug!("engine outcome channel closed; stopping fetcher");
                        break;
                    }
                }
                Err(err) => debug!(%err, "fetch task aborted"),
            },
        }
    }
    Ok(())
}

async fn execute(client: Client, request: FetchRequest) -> FetchOutcome {
    match request {
        FetchRequest::Metadata {
            criteria,
            start,
            count,
            epoch,
        } => match client.metadata(&criteria, start, count).await {
            Ok(images) => FetchOutcome::MetadataReady {
                start,
                images,
                epoch,
            },
            Err(source) => {
                let error = if start == 0 {
                    Error::MetadataLoad(source)
                } else {
                    Error::MetadataExtend { start, source }
                };
                FetchOutcome::MetadataFailed {
                    start,
                    error,
                    epoch,
                }
            }
        },
        FetchRequest::Image {
            index,
            url,
            intent,
            epoch,
        } => match client.image(&url).await {
            Ok(bytes) => FetchOutcome::ImageReady {
                index,
                intent,
                bytes,
                epoch,
            },
            Err(source) => {
                let error = match intent {
                    FetchIntent::Display => Error::ImageLoad { index, source },
                    FetchIntent::Prefetch => Error::Prefetch { index, source },
                };
                FetchOutcome::ImageFailed {
                    index,
                    intent,
                    error,
                    epoch,
                }
            }
        },
        FetchRequest::Probe { epoch } => {
            let reachable = match client.ping().await {
                Ok(()) => true,
                Err(source) => {
                    debug!(error = %Error::Probe(source), "liveness probe failed");
                    false
                }
            };
            FetchOutcome::ProbeResult { reachable, epoch }
        }
    }
}

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::catalog::ImageDescriptor;
use crate::events::DisplayEvent;

const DEFAULT_BACKDROP: &str = "#000";

/// Presentation sink. Rendering proper (fades, fullscreen, layout) lives
/// outside this crate; this task narrates display transitions on stdout.
pub async fn run(
    mut events: Receiver<DisplayEvent>,
    provider: String,
    cancel: CancellationToken,
) -> Result<()> {
    let mut current: Option<ImageDescriptor> = None;
    loop {
        select! {
            _ = cancel.cancelled() => break,
            maybe = events.recv() => {
                let Some(event) = maybe else { break };
                match event {
                    DisplayEvent::LoadingScreen(true) => println!("[loading...]"),
                    DisplayEvent::LoadingScreen(false) => println!("[ready]"),
                    DisplayEvent::Image { index, descriptor } => {
                        let backdrop = descriptor.color.as_deref().unwrap_or(DEFAULT_BACKDROP);
                        println!("[{index}] {} (backdrop {backdrop})", descriptor.url);
                        current = Some(descriptor);
                    }
                    DisplayEvent::AttributionVisible(true) => {
                        match current.as_ref().and_then(|d| attribution_line(d, &provider)) {
                            Some(line) => println!("    {line}"),
                            None => debug!("no attribution for current image"),
                        }
                    }
                    DisplayEvent::AttributionVisible(false) => debug!("attribution hidden"),
                    DisplayEvent::OfflineIndicator(true) => println!("[offline]"),
                    DisplayEvent::OfflineIndicator(false) => println!("[online]"),
                }
            }
        }
    }
    Ok(())
}

/// Credit line in the shape "Jane Doe <url> on Unsplash, Lofoten, March
/// 2021". None when the descriptor carries no attribution.
fn attribution_line(descriptor: &ImageDescriptor, provider: &str) -> Option<String> {
    let attribution = descriptor.attribution.as_ref()?;
    let mut line = attribution.photographer_name.clone();
    if !attribution.photographer_url.is_empty() {
        line.push_str(&format!(" <{}>", attribution.photographer_url));
    }
    match provider {
        "unsplash" => line.push_str(" on Unsplash"),
        "pexels" => line.push_str(" on Pexels"),
        _ => {}
    }
    if let Some(location) = &descriptor.location_name {
        line.push_str(&format!(", {location}"));
    }
    if let Some(taken) = &descriptor.captured_at {
        line.push_str(&format!(", {}", taken.format("%B %Y")));
    }
    Some(line)
}

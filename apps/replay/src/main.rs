// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Stream Replay - feed a captured geometry stream through the loader.
//!
//! A capture is every frame the server sent for one download, each prefixed
//! with its `u32` little-endian length. The replay builds an identity
//! translation table from the capture, runs a loading session against a
//! counting model builder and prints what would have been rendered.
//!
//! # Environment
//!
//! - `RUST_LOG` - log filter (default `info,ifc_stream_loader=debug`)
//! - `IFC_STREAM_TOPIC` - topic to replay (default: first data frame's topic)
//! - `IFC_STREAM_DEFAULTS` - JSON defaults table (default: standard palette)
//! - `IFC_STREAM_MAX_QUEUED_FRAMES`, `IFC_STREAM_FRAMES_PER_DRAIN`,
//!   `IFC_STREAM_SESSION_TIMEOUT_SECS`, `IFC_STREAM_OBJECTS_TOTAL` - loader settings

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::Parser;
use ifc_stream_loader::{GeometryLoader, ProgressPhase, SessionState};
use tracing::{debug, info, warn};

mod capture;
mod config;
mod summary;

use capture::CaptureTransport;
use config::Config;
use summary::SummaryBuilder;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture file with length-prefixed frames
    #[arg(value_name = "CAPTURE")]
    capture: PathBuf,

    /// Decode one frame per tick instead of everything delivered
    #[arg(short, long)]
    tick: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ifc_stream_loader=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    info!(
        capture = %args.capture.display(),
        tick = args.tick,
        max_queued_frames = ?config.loader.max_queued_frames,
        session_timeout_secs = ?config.loader.session_timeout_secs,
        "Starting IFC-Stream Replay"
    );

    let frames = capture::read_capture(&args.capture)?;
    let (summary, session) = replay(&config, frames, args.tick)?;

    println!("{summary}");
    if session.failed {
        bail!("loading session failed");
    }
    if !session.finished {
        warn!("capture ended before the stream was finished");
    }
    Ok(())
}

/// Run one loading session over captured frames
fn replay(config: &Config, frames: Vec<Bytes>, tick: bool) -> Result<(SummaryBuilder, SessionState)> {
    let topic_id = config
        .topic_id
        .or_else(|| capture::first_topic(&frames))
        .context("capture has no data frame and IFC_STREAM_TOPIC is not set")?;
    let translation = capture::identity_translation(&frames);
    let defaults = config.type_defaults()?;
    info!(
        frames = frames.len(),
        objects = translation.len(),
        topic_id,
        "replaying capture"
    );

    let mut loader = GeometryLoader::new(
        config.loader.clone(),
        SummaryBuilder::new(),
        CaptureTransport::new(frames, topic_id),
        translation,
        defaults,
    );
    loader.add_listener(|event| {
        if event.phase == ProgressPhase::Done {
            info!(
                read = event.nr_objects_read,
                total = event.nr_objects_total,
                "stream done"
            );
        }
    });
    loader.start()?;

    loop {
        // The transport delivers until it is paused or has nothing left
        while let Some(frame) = loader.transport_mut().next_frame() {
            loader.enqueue(frame);
        }
        if loader.transport().is_paused() {
            debug!(queued = loader.queued_frames(), "transport paused, draining queue");
        }

        let drained = if tick {
            loader.drain_one().map(usize::from)
        } else {
            loader.drain()
        };
        match drained {
            Ok(0) if loader.transport().is_exhausted() => break,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "replay stopped");
                break;
            }
        }
    }

    if !loader.session().failed {
        loader.poll_transport()?;
    }

    let session = loader.session();
    let stats = loader.stats();
    let unresolved = loader.unresolved();
    info!(
        objects_read = session.nr_objects_read,
        missing_translations = stats.missing_translations,
        duplicate_geometries = stats.duplicate_geometries,
        cleaned_up = loader.transport().cleaned_up(),
        "replay finished"
    );

    let mut summary = loader.into_builder();
    summary.unresolved = unresolved;
    Ok((summary, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_stream_core::{
        FrameType, GeometryRecord, Matrix4, Mesh, ModelBoundary, ObjectRecord, StreamWriter,
    };
    use ifc_stream_loader::LoaderConfig;

    fn config(loader: LoaderConfig) -> Config {
        Config {
            loader,
            topic_id: None,
            defaults_path: None,
        }
    }

    fn triangle() -> Mesh {
        Mesh::from_parts(vec![0.0; 9], vec![0.0; 9], vec![0, 1, 2])
    }

    fn object(info_id: u64, geometry_id: u64, ifc_type: &str) -> ObjectRecord {
        ObjectRecord {
            geometry_info_id: info_id,
            ifc_type: ifc_type.into(),
            transparent: false,
            geometry_id,
            matrix: Matrix4::identity(),
        }
    }

    fn capture() -> Vec<Bytes> {
        let mut header = StreamWriter::frame(9, FrameType::Data);
        header.write_header(16, Some(1.0), &ModelBoundary::from_aabb([0.0, 0.0, 0.0, 4.0, 2.0, 3.0]));

        let mut body = StreamWriter::frame(9, FrameType::Data);
        body.write_object(&object(1, 50, "IfcWindow"));
        body.write_geometry(&GeometryRecord {
            geometry_id: 50,
            reuse_count: 2,
            mesh: triangle(),
            color: None,
        });
        body.write_object(&object(2, 50, "IfcWindow"));
        body.write_geometry(&GeometryRecord {
            geometry_id: 60,
            reuse_count: 1,
            mesh: triangle(),
            color: Some([1.0, 0.0, 0.0, 1.0]),
        });
        body.write_object(&object(3, 60, "IfcWall"));

        let mut end = StreamWriter::frame(9, FrameType::Data);
        end.write_end();

        vec![
            Bytes::from(header.into_bytes()),
            Bytes::from(body.into_bytes()),
            Bytes::from(end.into_bytes()),
            Bytes::from(StreamWriter::frame(9, FrameType::EndOfStream).into_bytes()),
        ]
    }

    #[test]
    fn test_replay_counts_everything() {
        let (summary, session) = replay(&config(LoaderConfig::default()), capture(), false).unwrap();
        assert!(session.finished);
        assert_eq!(session.protocol_version, Some(16));
        assert_eq!(summary.geometries, 1);
        assert_eq!(summary.instanced_meshes, 2);
        assert_eq!(summary.specified_meshes, 1);
        assert_eq!(summary.entities, 3);
        // Both windows take the transparent palette entry
        assert_eq!(summary.transparent_meshes, 2);
        assert_eq!(summary.entities_by_type.get("IfcWindow"), Some(&2));
        assert!(summary.unresolved.is_empty());
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_tick_mode_with_backpressure() {
        let loader = LoaderConfig::default().with_max_queued_frames(2);
        let (summary, session) = replay(&config(loader), capture(), true).unwrap();
        assert!(session.finished);
        assert_eq!(summary.entities, 3);
    }

    #[test]
    fn test_fatal_stream_is_reported() {
        let mut bad = StreamWriter::frame(9, FrameType::Data);
        bad.write_header(13, None, &ModelBoundary::from_aabb([0.0; 6]));
        let (summary, session) =
            replay(&config(LoaderConfig::default()), vec![Bytes::from(bad.into_bytes())], false)
                .unwrap();
        assert!(session.failed);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.to_string().contains("unsupported protocol version 13"));
    }

    #[test]
    fn test_capture_without_data_frames() {
        let frames = vec![Bytes::from(StreamWriter::frame(9, FrameType::EndOfStream).into_bytes())];
        assert!(replay(&config(LoaderConfig::default()), frames, false).is_err());
    }
}

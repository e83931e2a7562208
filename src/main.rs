#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use minifb::{Key, Window, WindowOptions};
use pose_overlay::{
    Config, OverlayView, Session, Uploader, ViewBounds,
    overlay::draw_display_list,
    pipeline::{NokhwaCamera, available_cameras},
};

const WINDOW_TITLE: &str = "Pose Overlay";
const TARGET_FPS: usize = 30;

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env();
    match available_cameras() {
        Ok(cameras) => {
            for camera in &cameras {
                log::info!("found camera {}", camera.label);
            }
        }
        Err(err) => log::warn!("failed to enumerate cameras: {err:?}"),
    }

    let uploader = Uploader::new(&config).context("failed to build http client")?;
    log::info!(
        "posting frames to {} as {:?}",
        uploader.endpoint(),
        uploader.schema()
    );
    let (preview_tx, preview_rx) = bounded(1);
    let camera = NokhwaCamera::new(config.camera_index()).with_preview(preview_tx);

    let mut session = Session::new(config.clone(), uploader, camera);
    session
        .start()
        .with_context(|| format!("failed to start camera {}", config.camera_index()))?;

    let width = config.preview_width() as usize;
    let height = config.preview_height() as usize;
    let mut window = Window::new(
        WINDOW_TITLE,
        width,
        height,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(TARGET_FPS);

    let mut view = OverlayView::new(ViewBounds::new(width as f32, height as f32));
    let mut summary = String::new();

    while window.is_open() && !window.is_key_down(Key::Escape) {
        session.pump(&mut view);
        if view.summary() != summary {
            summary = view.summary().to_string();
            window.set_title(&format!("{WINDOW_TITLE} - contacts: {summary}"));
        }

        match preview_rx.try_iter().last() {
            Some(frame) => {
                let bounds = ViewBounds::new(frame.width as f32, frame.height as f32);
                if view.bounds() != bounds {
                    view.resize(bounds);
                }
                let mut rgba = frame.rgba;
                draw_display_list(&mut rgba, frame.width, frame.height, view.elements());
                let argb = rgba_to_argb(&rgba);
                window.update_with_buffer(&argb, frame.width as usize, frame.height as usize)?;
            }
            None => window.update(),
        }
    }

    session.stop();
    view.clear();
    log::info!("exiting");
    Ok(())
}

fn rgba_to_argb(rgba: &[u8]) -> Vec<u32> {
    rgba.chunks_exact(4)
        .map(|px| ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32)
        .collect()
}

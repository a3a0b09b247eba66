//! Entry point for the core viewer.

use anyhow::Result;
use clap::Parser;
use core_viewer::{app::App, config::Config, data, renderer::CoreOptions};
use std::sync::Arc;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let config = Config::parse();
    log::info!("Starting with {:?}", config);

    // Assets must be complete before any window or GPU state exists.
    let assets = data::load_core(&config.data_dir, config.palette.as_deref())?;
    let options = CoreOptions {
        shape: config.shape.into(),
        view_mode: config.view_mode.into(),
        point_size: config.point_size,
        ..CoreOptions::default()
    };

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Core Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), &assets, options))?;
    drop(assets);

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                let consumed = match app.handle_event(&window, &event) {
                    Ok(consumed) => consumed,
                    Err(e) => {
                        log::error!("Input handling failed: {e:#}");
                        app.core.dispose();
                        elwt.exit();
                        return;
                    }
                };
                if consumed {
                    return;
                }
                match event {
                    WindowEvent::CloseRequested => {
                        app.core.dispose();
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                            app.core.dispose();
                            elwt.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => match app.render(&window) {
                        Ok(()) => {}
                        Err(e) => match e.downcast_ref::<wgpu::SurfaceError>() {
                            Some(wgpu::SurfaceError::Lost) => {
                                let size = app.gfx.size;
                                app.gfx.resize(size);
                            }
                            Some(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("WGPU out of memory, exiting.");
                                app.core.dispose();
                                elwt.exit();
                            }
                            Some(other) => log::warn!("Surface error: {other:?}"),
                            None => {
                                log::error!("Render failed: {e:#}");
                                app.core.dispose();
                                elwt.exit();
                            }
                        },
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                // Request a redraw each frame.
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

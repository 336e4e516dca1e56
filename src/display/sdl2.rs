//! SDL2 window preview.
//! Draws the latest camera frame as an RGB24 texture and alpha-blends the
//! overlay texture on top.

use image::RgbaImage;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{BlendMode, Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;
use tracing::{info, warn};

use crate::capture::Frame;
use crate::display::preview::{PreviewError, PreviewMode, PreviewSurface};

pub struct Sdl2Preview {
    sdl: sdl2::Sdl,
    width: u32,
    height: u32,
    canvas: Option<Canvas<Window>>,
    texture_creator: Option<TextureCreator<WindowContext>>,
    event_pump: Option<EventPump>,
    overlay: Option<RgbaImage>,
}

impl Sdl2Preview {
    pub fn new(sdl: sdl2::Sdl, width: u32, height: u32) -> Self {
        Self {
            sdl,
            width,
            height,
            canvas: None,
            texture_creator: None,
            event_pump: None,
            overlay: None,
        }
    }

    fn build_canvas(&self, mode: PreviewMode) -> Result<Canvas<Window>, String> {
        let video = self.sdl.video()?;
        let window = video
            .window("argus", self.width, self.height)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let builder = window.into_canvas();
        let builder = match mode {
            PreviewMode::Accelerated => builder.accelerated().present_vsync(),
            PreviewMode::Software => builder.software(),
        };
        builder.build().map_err(|e| e.to_string())
    }
}

impl PreviewSurface for Sdl2Preview {
    fn start(&mut self, modes: &[PreviewMode]) -> Result<(), PreviewError> {
        let mut last_err = String::from("empty mode list");
        for &mode in modes {
            match self.build_canvas(mode) {
                Ok(canvas) => {
                    info!("Preview started in {:?} mode", mode);
                    self.texture_creator = Some(canvas.texture_creator());
                    self.canvas = Some(canvas);
                    self.event_pump =
                        Some(self.sdl.event_pump().map_err(PreviewError::AllModesFailed)?);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Preview mode {:?} failed: {}", mode, e);
                    last_err = e;
                }
            }
        }
        Err(PreviewError::AllModesFailed(last_err))
    }

    fn present(&mut self, frame: &Frame) -> Result<(), PreviewError> {
        let canvas = self.canvas.as_mut().ok_or(PreviewError::NotStarted)?;
        let creator = self.texture_creator.as_ref().ok_or(PreviewError::NotStarted)?;

        let mut frame_tex = creator
            .create_texture_streaming(PixelFormatEnum::RGB24, frame.meta.width, frame.meta.height)
            .map_err(|e| PreviewError::Present(e.to_string()))?;
        frame_tex
            .update(None, &frame.data, (frame.meta.width * 3) as usize)
            .map_err(|e| PreviewError::Present(e.to_string()))?;

        canvas.clear();
        canvas
            .copy(&frame_tex, None, None)
            .map_err(PreviewError::Present)?;

        if let Some(ref overlay) = self.overlay {
            // RGBA byte order maps to ABGR8888 on little-endian
            let mut overlay_tex = creator
                .create_texture_streaming(
                    PixelFormatEnum::ABGR8888,
                    overlay.width(),
                    overlay.height(),
                )
                .map_err(|e| PreviewError::Present(e.to_string()))?;
            overlay_tex.set_blend_mode(BlendMode::Blend);
            overlay_tex
                .update(None, overlay.as_raw(), (overlay.width() * 4) as usize)
                .map_err(|e| PreviewError::Present(e.to_string()))?;
            canvas
                .copy(&overlay_tex, None, None)
                .map_err(PreviewError::Present)?;
        }

        canvas.present();
        Ok(())
    }

    fn set_overlay(&mut self, overlay: Option<RgbaImage>) {
        self.overlay = overlay;
    }

    fn poll_interrupt(&mut self) -> bool {
        let Some(pump) = self.event_pump.as_mut() else {
            return false;
        };
        for event in pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => {
                    info!("Quit event received");
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    fn stop(&mut self) {
        self.event_pump = None;
        self.texture_creator = None;
        self.canvas = None;
        info!("Preview stopped");
    }
}

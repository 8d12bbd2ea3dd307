use crate::{
    error::Error,
    surface::{DrawSurface, Stroke},
};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use std::path::Path;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Raster overlay backed by an RGBA image.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
    detached: bool,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            detached: false,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Mark the canvas as discarded by its host. Every draw call fails afterwards.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    pub fn save<P>(&self, path: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        self.image
            .save(path)
            .map_err(|e| Error::SaveOverlay(e, path.to_owned()))
    }

    fn attached(&mut self) -> Result<&mut RgbaImage, Error> {
        if self.detached {
            Err(Error::SurfaceDetached)
        } else {
            Ok(&mut self.image)
        }
    }
}

impl DrawSurface for Canvas {
    fn size(&self) -> Result<(u32, u32), Error> {
        if self.detached {
            return Err(Error::SurfaceDetached);
        }
        Ok(self.image.dimensions())
    }

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), Error> {
        *self.attached()? = RgbaImage::new(width, height);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.attached()?
            .pixels_mut()
            .for_each(|pixel| *pixel = TRANSPARENT);
        Ok(())
    }

    fn stroke_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        stroke: Stroke,
    ) -> Result<(), Error> {
        let image = self.attached()?;
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if length > 0.0 {
            (-dy / length, dx / length)
        } else {
            (0.0, 0.0)
        };

        // thick lines are drawn as parallel one pixel segments
        let thickness = stroke.width.max(1.0).round() as i32;
        for t in 0..thickness {
            let offset = t as f32 - (thickness - 1) as f32 / 2.0;
            let (ox, oy) = (nx * offset, ny * offset);
            draw_line_segment_mut(
                image,
                (from.0 + ox, from.1 + oy),
                (to.0 + ox, to.1 + oy),
                stroke.color,
            );
        }
        Ok(())
    }

    fn fill_circle(
        &mut self,
        center: (f32, f32),
        radius: f32,
        fill: Rgba<u8>,
        outline: Stroke,
    ) -> Result<(), Error> {
        let image = self.attached()?;
        let center = (center.0.round() as i32, center.1.round() as i32);
        let radius = radius.round() as i32;
        draw_filled_circle_mut(image, center, radius, fill);
        for t in 0..outline.width.round() as i32 {
            draw_hollow_circle_mut(image, center, radius + t, outline.color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Canvas;
    use crate::{
        error::Error,
        surface::{DrawSurface, Stroke},
    };
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn draws_and_clears() {
        let mut canvas = Canvas::new(20, 10);
        canvas
            .stroke_line((0.0, 5.0), (19.0, 5.0), Stroke { color: RED, width: 3.0 })
            .unwrap();
        assert_eq!(*canvas.image().get_pixel(10, 4), RED);
        assert_eq!(*canvas.image().get_pixel(10, 6), RED);

        canvas.clear().unwrap();
        assert!(canvas.image().pixels().all(|pixel| pixel.0[3] == 0));
    }

    #[test]
    fn circle_has_fill_and_outline() {
        let mut canvas = Canvas::new(20, 20);
        canvas
            .fill_circle((10.0, 10.0), 4.0, RED, Stroke { color: WHITE, width: 1.0 })
            .unwrap();
        assert_eq!(*canvas.image().get_pixel(10, 10), RED);
        assert_eq!(*canvas.image().get_pixel(14, 10), WHITE);
    }

    #[test]
    fn resize_replaces_the_image() {
        let mut canvas = Canvas::new(4, 4);
        canvas.set_size(64, 48).unwrap();
        assert_eq!(canvas.size().unwrap(), (64, 48));
    }

    #[test]
    fn detached_canvas_refuses_to_draw() {
        let mut canvas = Canvas::new(4, 4);
        canvas.detach();
        assert!(matches!(canvas.clear(), Err(Error::SurfaceDetached)));
        assert!(matches!(canvas.size(), Err(Error::SurfaceDetached)));
    }
}

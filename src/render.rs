use crate::{
    config::{Config, OverlayStyle},
    error::Error,
    pose::{constants::CONNECTIONS, BodyRegion, Keypoint},
    surface::{DrawSurface, Stroke},
};
use bitvec::vec::BitVec;
use image::Rgba;

/// Draws the color coded skeleton overlay.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    visibility_threshold: f32,
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            visibility_threshold: config.visibility_threshold,
            style: config.overlay.clone(),
        }
    }

    fn region_color(&self, region: BodyRegion) -> Rgba<u8> {
        OverlayStyle::rgba(match region {
            BodyRegion::Face => self.style.face_color,
            BodyRegion::UpperBody => self.style.limb_color,
            BodyRegion::LowerBody => self.style.leg_color,
            BodyRegion::Hands => self.style.torso_color,
        })
    }

    /// Face only when both ends are on the face, then upper body, then lower
    /// body, otherwise torso.
    fn edge_color(&self, a: usize, b: usize) -> Rgba<u8> {
        let regions = [BodyRegion::of(a), BodyRegion::of(b)];
        let region = if regions.iter().all(|&r| r == BodyRegion::Face) {
            BodyRegion::Face
        } else if regions.contains(&BodyRegion::UpperBody) {
            BodyRegion::UpperBody
        } else if regions.contains(&BodyRegion::LowerBody) {
            BodyRegion::LowerBody
        } else {
            BodyRegion::Hands
        };
        self.region_color(region)
    }

    /// Clear `surface` and draw every sufficiently visible edge and joint of
    /// `keypoints`, scaled to the surface's current size.
    pub fn render<S>(&self, surface: &mut S, keypoints: &[Keypoint]) -> Result<(), Error>
    where
        S: DrawSurface + ?Sized,
    {
        surface.clear()?;
        let (width, height) = surface.size()?;

        let visible: BitVec = keypoints
            .iter()
            .map(|keypoint| keypoint.visibility >= self.visibility_threshold)
            .collect();
        let is_visible = |index: usize| visible.get(index).map_or(false, |bit| *bit);

        let line = self.style.line_width as f32;
        for (a, b) in CONNECTIONS {
            let (a, b) = (a.idx()?, b.idx()?);
            if !(is_visible(a) && is_visible(b)) {
                continue;
            }
            surface.stroke_line(
                keypoints[a].point.denormalize(width, height),
                keypoints[b].point.denormalize(width, height),
                Stroke {
                    color: self.edge_color(a, b),
                    width: line,
                },
            )?;
        }

        let outline = Stroke {
            color: OverlayStyle::rgba(self.style.joint_outline_color),
            width: self.style.joint_outline_width as f32,
        };
        for index in visible.iter_ones() {
            surface.fill_circle(
                keypoints[index].point.denormalize(width, height),
                self.style.joint_radius as f32,
                self.region_color(BodyRegion::of(index)),
                outline,
            )?;
        }
        Ok(())
    }
}

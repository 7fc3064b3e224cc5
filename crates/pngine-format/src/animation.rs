use crate::errors::FormatError;

pub const RECORD_LEN: usize = 12;
pub type SceneIdx = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scene {
    pub start_ms: u32,
    pub duration_ms: u32,
    pub frame_string_id: u16,
}

/// The animation timeline (spec §4.9): an ordered list of scenes plus a
/// loop flag. Scenes are stored sorted by `start_ms` so lookup is a binary
/// search.
#[derive(Debug, Clone, Copy)]
pub struct AnimationTable<'a> {
    bytes: &'a [u8],
    count: u16,
    looped: bool,
}

impl<'a> AnimationTable<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        if bytes.is_empty() {
            return Ok(Self { bytes: &[], count: 0, looped: false });
        }
        if bytes.len() < 4 {
            return Err(FormatError::Truncated);
        }
        let looped = bytes[0] != 0;
        let count = super::read_u16_at(bytes, 2)?;
        let needed = 4 + count as usize * RECORD_LEN;
        if bytes.len() < needed {
            return Err(FormatError::Truncated);
        }
        Ok(Self { bytes, count, looped })
    }

    fn scene(&self, idx: usize) -> Scene {
        let at = 4 + idx * RECORD_LEN;
        let rec = &self.bytes[at..at + RECORD_LEN];
        Scene {
            start_ms: u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]),
            duration_ms: u32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]),
            frame_string_id: u16::from_le_bytes([rec[8], rec[9]]),
        }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn total_duration_ms(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        let last = self.scene(self.count as usize - 1);
        last.start_ms + last.duration_ms
    }

    /// Binary-searches the scene list by `start_ms`; wraps `now_ms` first if
    /// the animation loops (spec §4.9).
    pub fn find_scene_at_time(&self, now_ms: u64) -> Option<SceneIdx> {
        if self.count == 0 {
            return None;
        }
        let total = self.total_duration_ms() as u64;
        let now = if self.looped && total > 0 { now_ms % total } else { now_ms };
        if now >= total && !self.looped {
            return None;
        }
        let mut lo = 0usize;
        let mut hi = self.count as usize;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let s = self.scene(mid);
            if now < s.start_ms as u64 {
                hi = mid;
            } else if now >= s.start_ms as u64 + s.duration_ms as u64 {
                lo = mid + 1;
            } else {
                return Some(mid as SceneIdx);
            }
        }
        None
    }

    pub fn scene_at(&self, idx: SceneIdx) -> Option<Scene> {
        if idx as u16 >= self.count {
            None
        } else {
            Some(self.scene(idx as usize))
        }
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTime {
    pub scene_time_s: f64,
    pub duration_s: f64,
    pub normalized: f64,
}

/// `get_scene_time` (spec §4.9): uniform-ready timing for the active scene.
pub fn get_scene_time(scene: Scene, now_ms: u64, looped: bool, total_duration_ms: u32) -> SceneTime {
    let now = if looped && total_duration_ms > 0 { now_ms % total_duration_ms as u64 } else { now_ms };
    let scene_time_ms = now.saturating_sub(scene.start_ms as u64) as f64;
    let duration_ms = scene.duration_ms as f64;
    let normalized = if duration_ms > 0.0 { (scene_time_ms / duration_ms).clamp(0.0, 1.0) } else { 0.0 };
    SceneTime { scene_time_s: scene_time_ms / 1000.0, duration_s: duration_ms / 1000.0, normalized }
}

pub fn write_animation_table(looped: bool, scenes: &[Scene]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + scenes.len() * RECORD_LEN);
    out.push(looped as u8);
    out.push(0);
    out.extend_from_slice(&(scenes.len() as u16).to_le_bytes());
    for s in scenes {
        out.extend_from_slice(&s.start_ms.to_le_bytes());
        out.extend_from_slice(&s.duration_ms.to_le_bytes());
        out.extend_from_slice(&s.frame_string_id.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        write_animation_table(
            false,
            &[
                Scene { start_ms: 0, duration_ms: 1000, frame_string_id: 0 },
                Scene { start_ms: 1000, duration_ms: 2000, frame_string_id: 1 },
            ],
        )
    }

    #[test]
    fn finds_scene_containing_timestamp() {
        let table = AnimationTable::parse(&sample()).unwrap();
        assert_eq!(table.find_scene_at_time(500), Some(0));
        assert_eq!(table.find_scene_at_time(1500), Some(1));
        assert_eq!(table.find_scene_at_time(5000), None);
    }

    #[test]
    fn looped_animation_wraps_time() {
        let bytes = write_animation_table(true, &[Scene { start_ms: 0, duration_ms: 1000, frame_string_id: 0 }]);
        let table = AnimationTable::parse(&bytes).unwrap();
        assert_eq!(table.find_scene_at_time(2500), Some(0));
    }

    #[test]
    fn scene_time_normalizes_to_unit_interval() {
        let scene = Scene { start_ms: 1000, duration_ms: 2000, frame_string_id: 0 };
        let t = get_scene_time(scene, 2000, false, 3000);
        assert_eq!(t.normalized, 0.5);
        assert_eq!(t.duration_s, 2.0);
    }
}

//! Flat menu identifier encoding
//!
//! Native popup menus hand back a single integer for the clicked leaf. The
//! codec packs a (monitor ordinal, opacity bucket) pair into that integer and
//! reserves two ids below the monitor range for the fixed control entries.
//!
//! Layout: `MONITOR_BASE * (ordinal + 1) + bucket_percent`.

use std::fmt;

/// Identifier of the `exit` entry
pub const EXIT_ID: u32 = 500;
/// Identifier of the `dim popups` toggle
pub const TOGGLE_POLLING_ID: u32 = 501;
/// Stride between monitor blocks. The first monitor starts at one stride.
pub const MONITOR_BASE: u32 = 1000;

/// One rung of the opacity ladder: 0% ("off") through 90% in steps of 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpacityBucket(u8);

impl OpacityBucket {
    pub const OFF: OpacityBucket = OpacityBucket(0);
    pub const MAX_PERCENT: u8 = 90;
    pub const STEP: u8 = 10;

    /// Bucket for an exact ladder percent (0, 10, ..., 90)
    pub fn from_percent(percent: u8) -> Option<Self> {
        if percent <= Self::MAX_PERCENT && percent % Self::STEP == 0 {
            Some(Self(percent))
        } else {
            None
        }
    }

    /// Bucket shown as checked for an arbitrary stored opacity.
    ///
    /// Rounds down to the ladder (a small epsilon absorbs f32 noise such as
    /// 0.7 being stored as 0.6999999), clamps into 0..=90 and maps
    /// non-finite values to "off".
    pub fn nearest_below(opacity: f32) -> Self {
        if !opacity.is_finite() {
            return Self::OFF;
        }

        let tenths = (opacity * 10.0 + 1e-4).floor();
        let tenths = tenths.clamp(0.0, f32::from(Self::MAX_PERCENT / Self::STEP));
        Self(tenths as u8 * Self::STEP)
    }

    /// Every bucket in menu order
    pub fn all() -> impl Iterator<Item = OpacityBucket> {
        (0..=Self::MAX_PERCENT).step_by(Self::STEP as usize).map(OpacityBucket)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Overlay opacity written for this bucket
    pub fn opacity(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Menu label: "off" for zero, otherwise "NN%"
    pub fn label(self) -> String {
        if self.0 == 0 {
            "off".to_string()
        } else {
            format!("{}%", self.0)
        }
    }
}

impl fmt::Display for OpacityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Semantic command decoded from a menu selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Shut the application down
    Exit,
    /// Flip the "dim popups" flag
    TogglePolling,
    /// Write `bucket` as the opacity of the monitor at `monitor`
    SetOpacity { monitor: usize, bucket: OpacityBucket },
    /// No selection or an id outside every known range; applied as a no-op
    Unknown,
}

/// Codec bound to the monitor count of one menu snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierCodec {
    monitor_count: usize,
}

impl IdentifierCodec {
    pub fn new(monitor_count: usize) -> Self {
        Self { monitor_count }
    }

    pub fn monitor_count(&self) -> usize {
        self.monitor_count
    }

    /// Identifier for a monitor/bucket pair.
    ///
    /// Returns `None` for ordinals outside this snapshot or ids that would
    /// not fit in a `u32`.
    pub fn encode(&self, monitor: usize, bucket: OpacityBucket) -> Option<u32> {
        if monitor >= self.monitor_count {
            return None;
        }

        let block = u32::try_from(monitor).ok()?.checked_add(1)?;
        MONITOR_BASE
            .checked_mul(block)?
            .checked_add(u32::from(bucket.percent()))
    }

    /// Decode a native selection. Never fails; anything unrecognised is `Unknown`.
    pub fn decode(&self, id: u32) -> Command {
        match id {
            EXIT_ID => Command::Exit,
            TOGGLE_POLLING_ID => Command::TogglePolling,
            id if id >= MONITOR_BASE => {
                let block = (id / MONITOR_BASE) as usize;
                let monitor = block - 1;
                let percent = id % MONITOR_BASE;

                if monitor >= self.monitor_count {
                    return Command::Unknown;
                }

                match u8::try_from(percent).ok().and_then(OpacityBucket::from_percent) {
                    Some(bucket) => Command::SetOpacity { monitor, bucket },
                    None => Command::Unknown,
                }
            }
            _ => Command::Unknown,
        }
    }

    /// Decode a popup result where `None` means the menu was dismissed
    pub fn decode_selection(&self, selection: Option<u32>) -> Command {
        selection.map_or(Command::Unknown, |id| self.decode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bucket(percent: u8) -> OpacityBucket {
        OpacityBucket::from_percent(percent).unwrap()
    }

    #[test]
    fn test_bijective_for_fifty_monitors() {
        let codec = IdentifierCodec::new(50);
        let mut seen = std::collections::HashSet::new();

        for monitor in 0..50 {
            for b in OpacityBucket::all() {
                let id = codec.encode(monitor, b).unwrap();
                assert_ne!(id, EXIT_ID);
                assert_ne!(id, TOGGLE_POLLING_ID);
                assert!(seen.insert(id), "duplicate id {}", id);
                assert_eq!(codec.decode(id), Command::SetOpacity { monitor, bucket: b });
            }
        }

        assert_eq!(seen.len(), 500);
    }

    #[test]
    fn test_reserved_ids() {
        let codec = IdentifierCodec::new(0);
        assert_eq!(codec.decode(EXIT_ID), Command::Exit);
        assert_eq!(codec.decode(TOGGLE_POLLING_ID), Command::TogglePolling);
    }

    #[test]
    fn test_unknown_ids() {
        let codec = IdentifierCodec::new(2);

        // Dismissal
        assert_eq!(codec.decode(0), Command::Unknown);
        assert_eq!(codec.decode_selection(None), Command::Unknown);
        // Below the monitor range
        assert_eq!(codec.decode(499), Command::Unknown);
        assert_eq!(codec.decode(999), Command::Unknown);
        // Not a ladder rung
        assert_eq!(codec.decode(1005), Command::Unknown);
        assert_eq!(codec.decode(1100), Command::Unknown);
        // Monitor beyond the snapshot
        assert_eq!(codec.decode(3000), Command::Unknown);
        assert_eq!(codec.decode(u32::MAX), Command::Unknown);
    }

    #[test]
    fn test_encode_rejects_out_of_snapshot() {
        let codec = IdentifierCodec::new(1);
        assert_eq!(codec.encode(0, bucket(90)), Some(1090));
        assert_eq!(codec.encode(1, bucket(0)), None);

        let huge = IdentifierCodec::new(usize::MAX);
        assert_eq!(huge.encode(10_000_000, bucket(0)), None);
    }

    #[test]
    fn test_bucket_ladder() {
        let labels: Vec<String> = OpacityBucket::all().map(OpacityBucket::label).collect();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels[0], "off");
        assert_eq!(labels[1], "10%");
        assert_eq!(labels[9], "90%");

        assert_eq!(OpacityBucket::from_percent(95), None);
        assert_eq!(OpacityBucket::from_percent(100), None);
        assert!((bucket(30).opacity() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nearest_below() {
        assert_eq!(OpacityBucket::nearest_below(0.35), bucket(30));
        assert_eq!(OpacityBucket::nearest_below(0.7), bucket(70));
        assert_eq!(OpacityBucket::nearest_below(0.0), bucket(0));
        assert_eq!(OpacityBucket::nearest_below(0.99), bucket(90));
        assert_eq!(OpacityBucket::nearest_below(1.0), bucket(90));
        assert_eq!(OpacityBucket::nearest_below(-0.2), bucket(0));
        assert_eq!(OpacityBucket::nearest_below(f32::NAN), bucket(0));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(monitor in 0usize..50, rung in 0u8..10) {
            let codec = IdentifierCodec::new(50);
            let b = bucket(rung * 10);
            let id = codec.encode(monitor, b).unwrap();

            prop_assert!(id != EXIT_ID && id != TOGGLE_POLLING_ID);
            prop_assert_eq!(codec.decode(id), Command::SetOpacity { monitor, bucket: b });
        }

        #[test]
        fn prop_decode_never_panics(id in any::<u32>(), count in 0usize..64) {
            let codec = IdentifierCodec::new(count);
            let _ = codec.decode(id);
        }

        #[test]
        fn prop_checked_bucket_in_ladder(opacity in -2.0f32..2.0) {
            let b = OpacityBucket::nearest_below(opacity);
            prop_assert!(b.percent() <= 90 && b.percent() % 10 == 0);
        }
    }
}

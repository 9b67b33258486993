//! Bunch-crossing selection

/// Allow/deny predicate over a list of bunch crossings to keep
#[derive(Debug, Clone)]
pub struct BunchCrossingFilter {
    keep: Vec<u16>,
    invert: bool,
    enabled: bool,
}

impl BunchCrossingFilter {
    /// An empty `keep` list disables the filter, whatever `invert` says.
    pub fn new(keep: Vec<u16>, invert: bool) -> Self {
        let enabled = !keep.is_empty();
        Self {
            keep,
            invert,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn allow(&self, bx: u16) -> bool {
        if !self.enabled {
            return true;
        }

        self.keep.contains(&bx) != self.invert
    }
}

//! Presentation surface module for pipsync
//!
//! The renderable video surface is created once and lives for the whole
//! process. Only its parent changes: it is either embedded in one of the
//! host regions registered here, detached (owned by the floating system),
//! or unattached. Moving it between parents is always a move, never a copy.

pub mod overlay;

pub use overlay::{ControlOverlay, OverlayButton, OverlayCommand, AUTO_HIDE_DELAY};

use crate::utils::error::{PipSyncError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity of the renderable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

/// Identity of a host region the surface can be embedded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostId(pub u64);

/// Width/height pair in points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size { width: 0.0, height: 0.0 };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle in the parent's coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering `size`
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Where the surface currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceOwnership {
    /// Child of an in-app host region
    EmbeddedIn(HostId),

    /// Owned solely by the floating system
    Detached,

    /// Not part of any hierarchy
    Unattached,
}

/// Destination of a reparent operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparentTarget {
    Host(HostId),
    Detached,
}

/// A region of the app screen that can embed the surface
#[derive(Debug, Clone)]
pub struct HostRegion {
    id: HostId,
    bounds: Rect,
    children: Vec<SurfaceId>,
}

impl HostRegion {
    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn children(&self) -> &[SurfaceId] {
        &self.children
    }
}

/// The single ownership slot for the renderable view
#[derive(Debug)]
pub struct PresentationSurface {
    id: SurfaceId,
    ownership: SurfaceOwnership,
    frame: Rect,
    hosts: HashMap<HostId, HostRegion>,
    next_host: u64,

    /// Host the surface was last embedded in
    last_host: Option<HostId>,

    /// Background rendering mode used while the floating system composites it
    pip_compositing: bool,

    /// Set between the floating system's will-start and did-stop callbacks
    floating_rendered: bool,

    layout_passes: u64,
}

impl PresentationSurface {
    /// Create a surface that is not yet part of any hierarchy
    pub fn new(id: SurfaceId) -> Self {
        Self {
            id,
            ownership: SurfaceOwnership::Unattached,
            frame: Rect::ZERO,
            hosts: HashMap::new(),
            next_host: 1,
            last_host: None,
            pip_compositing: false,
            floating_rendered: false,
            layout_passes: 0,
        }
    }

    /// Register a host region and return its identity
    pub fn add_host(&mut self, bounds: Rect) -> HostId {
        let id = HostId(self.next_host);
        self.next_host += 1;
        self.hosts.insert(
            id,
            HostRegion {
                id,
                bounds,
                children: Vec::new(),
            },
        );
        id
    }

    pub fn host(&self, id: HostId) -> Option<&HostRegion> {
        self.hosts.get(&id)
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn ownership(&self) -> SurfaceOwnership {
        self.ownership
    }

    /// Current parent host, if embedded
    pub fn parent(&self) -> Option<HostId> {
        match self.ownership {
            SurfaceOwnership::EmbeddedIn(host) => Some(host),
            _ => None,
        }
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn last_host(&self) -> Option<HostId> {
        self.last_host
    }

    /// A surface is usable once it has been embedded at least once
    pub fn is_realized(&self) -> bool {
        self.last_host.is_some()
    }

    pub fn pip_compositing(&self) -> bool {
        self.pip_compositing
    }

    pub fn set_pip_compositing(&mut self, enabled: bool) {
        self.pip_compositing = enabled;
    }

    pub fn is_floating_rendered(&self) -> bool {
        self.floating_rendered
    }

    pub fn set_floating_rendered(&mut self, floating: bool) {
        self.floating_rendered = floating;
    }

    /// Number of times the surface was (re)inserted into a host
    pub fn layout_passes(&self) -> u64 {
        self.layout_passes
    }

    /// Number of hosts currently listing the surface as a child
    pub fn parent_count(&self) -> usize {
        self.hosts
            .values()
            .map(|h| h.children.iter().filter(|c| **c == self.id).count())
            .sum()
    }

    /// Move the surface to `target`.
    ///
    /// Returns `Ok(false)` when the surface already is the sole child
    /// placement in `target`.
    pub fn reparent(&mut self, target: ReparentTarget) -> Result<bool> {
        match target {
            ReparentTarget::Host(host) => {
                if self.ownership == SurfaceOwnership::EmbeddedIn(host) && self.is_exclusively_in(host) {
                    debug!("Surface {:?} already embedded in {:?}", self.id, host);
                    return Ok(false);
                }

                if !self.hosts.contains_key(&host) {
                    return Err(PipSyncError::surface_error(format!("Unknown host region {:?}", host)));
                }

                self.remove_from_hosts();
                self.insert_into(host)?;
                debug!("Surface {:?} embedded in {:?}", self.id, host);
                Ok(true)
            }
            ReparentTarget::Detached => {
                if self.ownership == SurfaceOwnership::Detached {
                    return Ok(false);
                }

                self.remove_from_hosts();
                self.ownership = SurfaceOwnership::Detached;
                debug!("Surface {:?} detached to floating system", self.id);
                Ok(true)
            }
        }
    }

    /// Remove and reinsert into the current parent to force a full layout pass
    pub fn force_relayout(&mut self) -> Result<()> {
        match self.ownership {
            SurfaceOwnership::EmbeddedIn(host) => {
                self.remove_from_hosts();
                self.insert_into(host)
            }
            _ => {
                debug!("Relayout skipped, surface {:?} has no parent", self.id);
                Ok(())
            }
        }
    }

    fn is_exclusively_in(&self, host: HostId) -> bool {
        self.hosts.iter().all(|(id, region)| {
            let count = region.children.iter().filter(|c| **c == self.id).count();
            if *id == host {
                count == 1
            } else {
                count == 0
            }
        })
    }

    fn remove_from_hosts(&mut self) {
        let id = self.id;
        for region in self.hosts.values_mut() {
            region.children.retain(|c| *c != id);
        }
    }

    fn insert_into(&mut self, host: HostId) -> Result<()> {
        let region = self
            .hosts
            .get_mut(&host)
            .ok_or_else(|| PipSyncError::surface_error(format!("Unknown host region {:?}", host)))?;

        region.children.push(self.id);
        self.frame = Rect::from_size(region.bounds.size());
        self.ownership = SurfaceOwnership::EmbeddedIn(host);
        self.last_host = Some(host);
        self.layout_passes += 1;
        Ok(())
    }
}

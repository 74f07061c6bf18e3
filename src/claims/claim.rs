//! The claim record and its spatial predicates.
//!
//! Bounds are inclusive. Overlap and containment work on the X/Z plane only:
//! a claim owns the full column above its floor, so the upper Y bound is the
//! world ceiling and only `lower.y` carries meaning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::types::{
    BlockPos, ClaimKey, ClaimStatus, GroupKey, Location, PlayerId, ADMIN_OWNER,
    CLAIM_SCHEMA_VERSION,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub key: Option<ClaimKey>,
    pub owner: PlayerId,
    /// Set on subclaims only; always names a top-level claim.
    pub parent: Option<ClaimKey>,
    pub group: Option<GroupKey>,
    pub world: String,
    pub lower: BlockPos,
    pub upper: BlockPos,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_resizeable")]
    pub resizeable: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(skip)]
    pub status: ClaimStatus,
    pub schema_version: u8,
}

fn default_resizeable() -> bool {
    true
}

impl Claim {
    /// Build an unsaved claim from two arbitrary corners. X/Z are normalized,
    /// the floor is the lower of the two Y values and the top is `ceiling - 1`.
    pub fn from_corners(
        world: impl Into<String>,
        a: BlockPos,
        b: BlockPos,
        owner: PlayerId,
        ceiling: i32,
    ) -> Self {
        let now = Utc::now();
        let lower = BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let upper = BlockPos::new(a.x.max(b.x), (ceiling - 1).max(lower.y), a.z.max(b.z));
        Self {
            key: None,
            owner,
            parent: None,
            group: None,
            world: world.into(),
            lower,
            upper,
            locked: false,
            resizeable: true,
            created_at: now,
            modified_at: now,
            status: ClaimStatus::Active,
            schema_version: CLAIM_SCHEMA_VERSION,
        }
    }

    pub fn is_subclaim(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_admin_claim(&self) -> bool {
        self.owner == ADMIN_OWNER
    }

    pub fn is_active(&self) -> bool {
        self.status == ClaimStatus::Active
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == player
    }

    /// The top-level claim of this family: the parent for a subclaim, else self.
    pub fn family_root(&self) -> Option<ClaimKey> {
        self.parent.or(self.key)
    }

    pub fn contains(&self, location: &Location, ignore_height: bool) -> bool {
        location.world == self.world
            && (ignore_height || location.y >= self.lower.y)
            && location.x >= self.lower.x
            && location.x <= self.upper.x
            && location.z >= self.lower.z
            && location.z <= self.upper.z
    }

    /// True when `other` lies entirely inside this claim on the X/Z plane.
    pub fn contains_claim(&self, other: &Claim) -> bool {
        self.world == other.world
            && self.lower.x <= other.lower.x
            && self.lower.z <= other.lower.z
            && self.upper.x >= other.upper.x
            && self.upper.z >= other.upper.z
    }

    pub fn overlaps(&self, other: &Claim) -> bool {
        if self.world != other.world {
            return false;
        }
        !(self.upper.x < other.lower.x
            || self.lower.x > other.upper.x
            || self.upper.z < other.lower.z
            || self.lower.z > other.upper.z)
    }

    pub fn is_corner(&self, location: &Location) -> bool {
        location.world == self.world
            && (location.x == self.lower.x || location.x == self.upper.x)
            && (location.z == self.lower.z || location.z == self.upper.z)
    }

    /// East/west extent in blocks.
    pub fn width(&self) -> i64 {
        i64::from(self.upper.x) - i64::from(self.lower.x) + 1
    }

    /// North/south extent in blocks.
    pub fn length(&self) -> i64 {
        i64::from(self.upper.z) - i64::from(self.lower.z) + 1
    }

    pub fn area(&self) -> i64 {
        self.width() * self.length()
    }

    /// Candidate bounds for dragging the corner at `first` to `second`.
    ///
    /// Each axis moves whichever bound `first` sits on. Returns `None` when the
    /// drag crosses the opposite edge.
    pub fn resize_check(&self, first: &Location, second: &Location) -> Option<Claim> {
        let mut lower = self.lower;
        let mut upper = self.upper;

        if first.x == self.lower.x {
            lower.x = second.x;
        }
        if first.x == self.upper.x {
            upper.x = second.x;
        }
        if first.z == self.lower.z {
            lower.z = second.z;
        }
        if first.z == self.upper.z {
            upper.z = second.z;
        }

        if lower.x > upper.x || lower.z > upper.z {
            return None;
        }

        let mut candidate = self.clone();
        candidate.lower = lower;
        candidate.upper = upper;
        Some(candidate)
    }

    /// True when `other` is narrower than this claim on either axis.
    pub fn shrinks_to(&self, other: &Claim) -> bool {
        other.lower.x > self.lower.x
            || other.upper.x < self.upper.x
            || other.lower.z > self.lower.z
            || other.upper.z < self.upper.z
    }

    /// True when `other` reaches past this claim on either axis.
    pub fn grows_to(&self, other: &Claim) -> bool {
        other.lower.x < self.lower.x
            || other.upper.x > self.upper.x
            || other.lower.z < self.lower.z
            || other.upper.z > self.upper.z
    }

    /// Copy the X/Z bounds of `shape` onto this claim.
    pub fn reshape(&mut self, shape: &Claim) {
        self.lower.x = shape.lower.x;
        self.lower.z = shape.lower.z;
        self.upper.x = shape.upper.x;
        self.upper.z = shape.upper.z;
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    pub fn describe(&self) -> String {
        format!(
            "{}[{},{},{} .. {},{},{}]",
            self.world,
            self.lower.x,
            self.lower.y,
            self.lower.z,
            self.upper.x,
            self.upper.y,
            self.upper.z
        )
    }
}

/// Outcome of the claim factories: either the validated candidate or every
/// claim that blocked it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimResult {
    Success(Claim),
    Overlap(Vec<Claim>),
    /// The two corners were in different worlds.
    WorldMismatch,
}

impl ClaimResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ClaimResult::Success(_))
    }

    pub fn claim(&self) -> Option<&Claim> {
        match self {
            ClaimResult::Success(claim) => Some(claim),
            _ => None,
        }
    }

    pub fn into_claim(self) -> Option<Claim> {
        match self {
            ClaimResult::Success(claim) => Some(claim),
            _ => None,
        }
    }

    pub fn overlaps(&self) -> &[Claim] {
        match self {
            ClaimResult::Overlap(claims) => claims,
            _ => &[],
        }
    }
}

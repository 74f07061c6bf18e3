//! Expiry of claims whose owners stopped logging in.
//!
//! Runs on the host's schedule (hourly is typical). Only active, unlocked,
//! player-owned top-level claims are considered; their subclaims go with
//! them through [`ClaimEngine::abandon`].

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::claims::engine::ClaimEngine;
use crate::claims::lifecycle::AbandonOutcome;
use crate::claims::types::{ClaimKey, PlayerId};

/// Counters from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryStats {
    pub claims_checked: u64,
    pub claims_deleted: u64,
    pub claims_reclaimed: u64,
    /// Claims whose owner has no player state; they are left alone.
    pub unknown_owners: u64,
}

impl ExpiryStats {
    pub fn summary_line(&self) -> String {
        format!(
            "checked {} claims: {} deleted, {} reclaimed, {} with unknown owners",
            self.claims_checked, self.claims_deleted, self.claims_reclaimed, self.unknown_owners
        )
    }
}

/// A claim at or past its expiry date.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiringClaim {
    pub key: ClaimKey,
    pub owner: PlayerId,
    pub owner_name: String,
    pub days_inactive: i64,
}

impl ClaimEngine {
    /// Claims whose owner's last login is more than `claim_expire_days`
    /// before `now`, most inactive first. Ignores the auto-expire switch.
    pub fn expiring_claims(&self, now: DateTime<Utc>) -> Vec<ExpiringClaim> {
        let cutoff = Duration::days(self.settings.claim_expire_days);
        let mut results: Vec<ExpiringClaim> = self
            .caches
            .claims
            .top_level()
            .filter(|claim| claim.is_active() && !claim.locked && !claim.is_admin_claim())
            .filter_map(|claim| {
                let key = claim.key?;
                let owner = self.caches.players.get(claim.owner)?;
                if owner.last_login + cutoff >= now {
                    return None;
                }
                Some(ExpiringClaim {
                    key,
                    owner: claim.owner,
                    owner_name: owner.name.clone(),
                    days_inactive: now.signed_duration_since(owner.last_login).num_days(),
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.days_inactive
                .cmp(&a.days_inactive)
                .then_with(|| a.key.cmp(&b.key))
        });
        results
    }

    /// Abandon every expired claim. Does nothing unless auto-expire is on
    /// with a positive day count.
    pub fn run_expiry_sweep(&mut self, now: DateTime<Utc>) -> ExpiryStats {
        let mut stats = ExpiryStats::default();
        if !self.settings.claim_auto_expire || self.settings.claim_expire_days <= 0 {
            debug!("claim expiry disabled; skipping sweep");
            return stats;
        }

        let candidates: Vec<(ClaimKey, PlayerId)> = self
            .caches
            .claims
            .top_level()
            .filter(|claim| claim.is_active() && !claim.locked && !claim.is_admin_claim())
            .filter_map(|claim| claim.key.map(|key| (key, claim.owner)))
            .collect();
        stats.claims_checked = candidates.len() as u64;

        let expired: Vec<ClaimKey> = self.expiring_claims(now).into_iter().map(|c| c.key).collect();
        stats.unknown_owners = candidates
            .iter()
            .filter(|(_, owner)| self.caches.players.get(*owner).is_none())
            .count() as u64;

        for key in expired {
            match self.abandon(key) {
                Ok(AbandonOutcome::Deleted) => stats.claims_deleted += 1,
                Ok(AbandonOutcome::Reclaimed) => stats.claims_reclaimed += 1,
                Err(e) => warn!("could not expire claim {key}: {e}"),
            }
        }

        if stats.claims_deleted + stats.claims_reclaimed > 0 {
            info!("claim expiry: {}", stats.summary_line());
        } else {
            debug!("claim expiry: {}", stats.summary_line());
        }
        stats
    }
}

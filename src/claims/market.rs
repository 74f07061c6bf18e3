//! Claim sales and subclaim leases paid through the host economy.
//!
//! A [`Listing`] is what a sale sign carries: the kind, the price and the
//! seller's display name. Listing a top-level claim puts the whole family
//! up for sale; listing a subclaim offers a lease of it.

use log::info;
use thiserror::Error;

use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::permission::PermissionLevel;
use crate::claims::types::{ClaimKey, Location, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleKind {
    /// Ownership of the top-level claim changes hands.
    Sale,
    /// The buyer gets build and grant on one subclaim.
    Lease,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub kind: SaleKind,
    pub price: f64,
    /// Owner name, or the configured admin name for server claims.
    pub seller_name: String,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub claim: ClaimKey,
    pub kind: SaleKind,
    pub price: f64,
}

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("no economy is available")]
    NoEconomy,
    #[error("no claim at this location")]
    NoClaim,
    #[error("only the claim owner can sell this claim")]
    NotOwner,
    #[error("invalid price")]
    InvalidPrice,
    #[error("top-level claims can only be sold, not leased")]
    LeaseOnTopLevel,
    #[error("the listing does not match the claim owner")]
    SellerMismatch,
    #[error("you already own this claim")]
    AlreadyOwner,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("claim group '{0}' limit reached")]
    GroupLimitReached(String),
    #[error("payment was refused")]
    PaymentRefused,
    #[error(transparent)]
    Store(#[from] ClaimError),
}

/// Read a price from sign text, ignoring currency symbols and separators.
pub fn parse_price(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let price: f64 = digits.parse().ok()?;
    (price.is_finite() && price >= 0.0).then_some(price)
}

impl ClaimEngine {
    /// Offer the claim at `location`. Only its owner or an admin-mode
    /// player may list it.
    pub fn create_listing(
        &self,
        seller: PlayerId,
        location: &Location,
        price: f64,
    ) -> Result<Listing, MarketError> {
        if self.economy.is_none() {
            return Err(MarketError::NoEconomy);
        }
        if !price.is_finite() || price < 0.0 {
            return Err(MarketError::InvalidPrice);
        }
        let claim = self.claim_at(location, true).ok_or(MarketError::NoClaim)?;
        let admin_mode = self.player(seller).map(|s| s.admin_mode).unwrap_or(false);
        if !admin_mode && !claim.is_owned_by(seller) {
            return Err(MarketError::NotOwner);
        }
        let kind = if claim.is_subclaim() {
            SaleKind::Lease
        } else {
            SaleKind::Sale
        };
        let group_name = match kind {
            SaleKind::Sale => claim
                .group
                .and_then(|key| self.group(key))
                .map(|group| group.name.clone()),
            SaleKind::Lease => None,
        };
        Ok(Listing {
            kind,
            price,
            seller_name: self.owner_display_name(claim.owner, claim.is_admin_claim()),
            group_name,
        })
    }

    /// Buy the claim under a listing placed at `location`.
    ///
    /// A sale listed inside a subclaim sells the parent claim.
    pub fn purchase(
        &mut self,
        buyer: PlayerId,
        location: &Location,
        listing: &Listing,
    ) -> Result<Purchase, MarketError> {
        let economy = self.economy.clone().ok_or(MarketError::NoEconomy)?;
        let mut claim = self
            .claim_at(location, true)
            .cloned()
            .ok_or(MarketError::NoClaim)?;
        if listing.kind == SaleKind::Sale {
            if let Some(parent) = claim.parent {
                claim = self
                    .claim(parent)
                    .filter(|c| c.is_active())
                    .cloned()
                    .ok_or(MarketError::NoClaim)?;
            }
        }
        if claim.is_top_level() && listing.kind == SaleKind::Lease {
            return Err(MarketError::LeaseOnTopLevel);
        }
        let key = claim.key.ok_or(MarketError::NoClaim)?;

        let admin_claim = claim.is_admin_claim();
        let seller_name = self.owner_display_name(claim.owner, admin_claim);
        if seller_name != listing.seller_name {
            return Err(MarketError::SellerMismatch);
        }
        if claim.is_owned_by(buyer) {
            return Err(MarketError::AlreadyOwner);
        }
        if !listing.price.is_finite() || listing.price < 0.0 {
            return Err(MarketError::InvalidPrice);
        }
        if !economy.has(buyer, listing.price) {
            return Err(MarketError::InsufficientFunds);
        }
        if let Some(group) = claim.group.and_then(|g| self.group(g)) {
            if let Some(group_key) = group.key {
                if self.group_limit_reached(buyer, group_key) {
                    return Err(MarketError::GroupLimitReached(group.name.clone()));
                }
            }
        }

        if !economy.withdraw(buyer, listing.price) {
            return Err(MarketError::PaymentRefused);
        }
        if !admin_claim {
            economy.deposit(claim.owner, listing.price);
        }

        match listing.kind {
            SaleKind::Sale => {
                self.transfer(key, buyer)?;
                info!("claim {key} sold to {buyer} for {}", listing.price);
            }
            SaleKind::Lease => {
                self.remove_all_permissions(key);
                self.set_permission(key, buyer, PermissionLevel::BuildGrant)?;
                info!("subclaim {key} leased to {buyer} for {}", listing.price);
            }
        }

        Ok(Purchase {
            claim: key,
            kind: listing.kind,
            price: listing.price,
        })
    }

    fn owner_display_name(&self, owner: PlayerId, admin_claim: bool) -> String {
        if admin_claim {
            return self.settings.admin_name.clone();
        }
        self.player(owner)
            .map(|state| state.name.clone())
            .unwrap_or_else(|| owner.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_tolerate_currency_formatting() {
        assert_eq!(parse_price("$1250"), Some(1250.0));
        assert_eq!(parse_price("12.50 coins"), Some(12.5));
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price(""), None);
    }
}

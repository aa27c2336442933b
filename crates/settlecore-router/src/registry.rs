use settlecore_types::{AccountId, Result, SettleError, VenueId};

use crate::venue::{AggregatorStats, VenueInfo};

/// The aggregator's venue list and global totals. Ids are `1..=N` in
/// registration order, so `venues[i].id == VenueId(i + 1)`.
#[derive(Debug)]
pub(crate) struct VenueRegistry {
    pub(crate) admin: AccountId,
    venues: Vec<VenueInfo>,
    pub(crate) total_volume: u64,
    pub(crate) total_swaps: u64,
    pub(crate) fees_collected: u64,
}

impl VenueRegistry {
    pub(crate) fn new(admin: AccountId, names: &[String]) -> Result<Self> {
        let venues = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                u8::try_from(i + 1)
                    .map(|id| VenueInfo::new(VenueId(id), name.clone()))
                    .map_err(|_| {
                        SettleError::Configuration(format!("too many venues: {}", names.len()))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            admin,
            venues,
            total_volume: 0,
            total_swaps: 0,
            fees_collected: 0,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.venues.len()
    }

    pub(crate) fn venues(&self) -> &[VenueInfo] {
        &self.venues
    }

    /// Enabled venues in id order.
    pub(crate) fn enabled(&self) -> impl Iterator<Item = &VenueInfo> {
        self.venues.iter().filter(|v| v.enabled)
    }

    fn index(&self, id: VenueId) -> Result<usize> {
        usize::from(id.0)
            .checked_sub(1)
            .filter(|&i| i < self.venues.len())
            .ok_or(SettleError::InvalidVenueId(id))
    }

    pub(crate) fn get(&self, id: VenueId) -> Result<&VenueInfo> {
        Ok(&self.venues[self.index(id)?])
    }

    pub(crate) fn get_mut(&mut self, id: VenueId) -> Result<&mut VenueInfo> {
        let i = self.index(id)?;
        Ok(&mut self.venues[i])
    }

    pub(crate) fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            admin: self.admin,
            total_volume: self.total_volume,
            total_swaps: self.total_swaps,
            fees_collected: self.fees_collected,
        }
    }
}

//! Vote-escrow handlers: lock lifecycle, voting and vote queries.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, I256, U256};
use fastnum::D256;
use tracing::warn;

use super::Session;
use crate::{
    abi::{voter, voting_escrow},
    error::DexError,
    num::{Converter, parse_fixed},
    store::StoreDelta,
    types::{
        Asset, Event, TokenId, TxQueue, TxStep, VeDistReward, Vote, VoteInput,
    },
};

/// Scales user-entered vote percentages to the voter contract's
/// fixed-point integers: entries with value exactly zero are dropped,
/// the rest multiplied by 100 (two fractional digits of precision).
/// All-zero input is invalid.
pub fn prepare_votes(votes: &[VoteInput]) -> Result<(Vec<Address>, Vec<I256>), DexError> {
    let mut pools = Vec::with_capacity(votes.len());
    let mut weights = Vec::with_capacity(votes.len());

    for vote in votes {
        let (negative, magnitude) = match vote.value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, vote.value.as_str()),
        };
        let raw = parse_fixed(magnitude, 2)
            .ok_or_else(|| DexError::InvalidRequest(format!("bad vote value: {}", vote.value)))?;
        if raw.is_zero() {
            continue;
        }
        let weight = I256::try_from(raw)
            .map_err(|_| DexError::InvalidRequest(format!("vote value too large: {}", vote.value)))?;
        pools.push(vote.address);
        weights.push(if negative { -weight } else { weight });
    }

    if pools.is_empty() {
        return Err(DexError::InvalidRequest(
            "no non-zero votes to cast".to_string(),
        ));
    }
    Ok((pools, weights))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

impl Session {
    async fn gov_asset(&self) -> Result<Asset, DexError> {
        match self.store.snapshot().gov_token {
            Some(asset) => Ok(asset),
            None => self.gateway.token_metadata(self.chain.gov_token()).await,
        }
    }

    pub(super) async fn get_vest_nfts(&self) -> Result<(), DexError> {
        let nfts = self.gateway.vest_nfts(self.gov_decimals()).await?;
        self.store.merge(StoreDelta::vest_nfts(nfts.clone()));
        self.notifier.emit(Event::VestNftsReturned(nfts));
        Ok(())
    }

    pub(super) async fn create_vest(
        &self,
        amount: &str,
        lock_duration: u64,
    ) -> Result<(), DexError> {
        let gov = self.gov_asset().await?;
        let raw = Self::raw_amount(&gov, amount)?;

        let allow = TxStep::new(format!("Checking your {} allowance", gov.symbol));
        let vest = TxStep::new("Vest your tokens");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Vest {}", gov.symbol),
            "Vest",
            "Vest Created",
            vec![allow.clone(), vest.clone()],
        )));

        let escrow_address = self.chain.voting_escrow();
        let allowance = self.gateway.allowance(gov.address, escrow_address).await?;
        self.orchestrator
            .ensure_allowance(
                allow.uuid(),
                &gov,
                escrow_address,
                "vesting contract",
                allowance,
                raw,
            )
            .await?;

        let instance = voting_escrow::VotingEscrow::new(escrow_address, self.provider.clone());
        self.orchestrator
            .submit(vest.uuid(), instance.create_lock(raw, U256::from(lock_duration)))
            .await?;

        self.notifier.emit(Event::VestCreated);
        self.refresh_vests().await;
        Ok(())
    }

    pub(super) async fn increase_vest_amount(
        &self,
        token_id: TokenId,
        amount: &str,
    ) -> Result<(), DexError> {
        let gov = self.gov_asset().await?;
        let raw = Self::raw_amount(&gov, amount)?;

        let allow = TxStep::new(format!("Checking your {} allowance", gov.symbol));
        let increase = TxStep::new("Increase the vested amount");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Increase vest #{token_id}"),
            "Vest",
            "Vest Increased",
            vec![allow.clone(), increase.clone()],
        )));

        let escrow_address = self.chain.voting_escrow();
        let allowance = self.gateway.allowance(gov.address, escrow_address).await?;
        self.orchestrator
            .ensure_allowance(
                allow.uuid(),
                &gov,
                escrow_address,
                "vesting contract",
                allowance,
                raw,
            )
            .await?;

        let instance = voting_escrow::VotingEscrow::new(escrow_address, self.provider.clone());
        self.orchestrator
            .submit(
                increase.uuid(),
                instance.increase_amount(U256::from(token_id), raw),
            )
            .await?;

        self.notifier.emit(Event::VestIncreased);
        self.refresh_vests().await;
        Ok(())
    }

    pub(super) async fn increase_vest_duration(
        &self,
        token_id: TokenId,
        lock_duration: u64,
    ) -> Result<(), DexError> {
        let step = TxStep::new("Extend the lock duration");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Extend vest #{token_id}"),
            "Vest",
            "Vest Increased",
            vec![step.clone()],
        )));

        let instance =
            voting_escrow::VotingEscrow::new(self.chain.voting_escrow(), self.provider.clone());
        self.orchestrator
            .submit(
                step.uuid(),
                instance.increase_unlock_time(U256::from(token_id), U256::from(lock_duration)),
            )
            .await?;

        self.notifier.emit(Event::VestIncreased);
        self.refresh_vests().await;
        Ok(())
    }

    /// Withdraws an expired lock; the position's balance drops to zero
    /// and the next refresh removes it from the cache.
    pub(super) async fn withdraw_vest(&self, token_id: TokenId) -> Result<(), DexError> {
        let lock = self
            .gateway
            .lock_state(token_id, self.gov_decimals())
            .await?;
        if lock.end > unix_now() {
            return Err(DexError::VestNotExpired(token_id));
        }

        let step = TxStep::new("Withdraw your expired tokens");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Withdraw vest #{token_id}"),
            "Vest",
            "Vest Withdrawn",
            vec![step.clone()],
        )));

        let instance =
            voting_escrow::VotingEscrow::new(self.chain.voting_escrow(), self.provider.clone());
        self.orchestrator
            .submit(step.uuid(), instance.withdraw(U256::from(token_id)))
            .await?;

        self.notifier.emit(Event::VestWithdrawn);
        self.refresh_after_tx().await;
        self.refresh_vests().await;
        Ok(())
    }

    /// Casts all non-zero votes of one position in a single voter call.
    pub(super) async fn vote(
        &self,
        token_id: TokenId,
        votes: Vec<VoteInput>,
    ) -> Result<(), DexError> {
        let (pools, weights) = prepare_votes(&votes)?;

        let step = TxStep::new("Cast your votes");
        self.notifier.emit(Event::TxAdded(TxQueue::new(
            format!("Vote with #{token_id}"),
            "Vote",
            "Votes Cast",
            vec![step.clone()],
        )));

        let instance = voter::Voter::new(self.chain.voter(), self.provider.clone());
        self.orchestrator
            .submit(
                step.uuid(),
                instance.vote(U256::from(token_id), pools, weights),
            )
            .await?;

        self.notifier.emit(Event::VoteReturned);
        Ok(())
    }

    /// Reads the position's current votes across all gauged pairs,
    /// normalized to signed percentages of its total absolute weight.
    pub(super) async fn get_vest_votes(&self, token_id: TokenId) -> Result<(), DexError> {
        let pairs: Vec<Address> = self
            .store
            .pairs()
            .iter()
            .filter(|pair| pair.gauge.is_some())
            .map(|pair| pair.address)
            .collect();
        let raw_votes = self.gateway.votes(token_id, &pairs).await;

        let converter = Converter::new(self.gov_decimals());
        let weights: Vec<D256> = raw_votes
            .iter()
            .map(|vote| converter.from_signed(*vote))
            .collect();
        let total: D256 = weights
            .iter()
            .fold(D256::ZERO, |acc, weight| acc + weight.abs());

        let votes: Vec<Vote> = if total.is_zero() {
            vec![]
        } else {
            pairs
                .into_iter()
                .zip(weights)
                .filter(|(_, weight)| !weight.is_zero())
                .map(|(pair, weight)| Vote {
                    pair,
                    percent: weight / total * D256::from(100),
                })
                .collect()
        };

        self.notifier.emit(Event::VestVotesReturned(votes));
        Ok(())
    }

    /// Claimable rebase distribution attached to one position.
    pub(super) async fn get_vest_balances(&self, token_id: TokenId) -> Result<(), DexError> {
        let gov_decimals = self.gov_decimals();
        let (lock, claimable) = futures::try_join!(
            self.gateway.lock_state(token_id, gov_decimals),
            self.gateway.claimable(token_id, gov_decimals),
        )?;

        self.notifier
            .emit(Event::VestBalancesReturned(vec![VeDistReward {
                token_id,
                lock_value: lock.voting_power,
                claimable,
            }]));
        Ok(())
    }

    /// Post-transaction vest refresh; failure keeps the stale slice.
    pub(super) async fn refresh_vests(&self) {
        if let Err(err) = self.get_vest_nfts().await {
            warn!(%err, "vest refresh after transaction failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(byte: u8, value: &str) -> VoteInput {
        VoteInput {
            address: Address::with_last_byte(byte),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_prepare_votes_scales_by_100() {
        let (pools, weights) =
            prepare_votes(&[input(1, "50"), input(2, "25.5"), input(3, "-24.5")]).unwrap();
        assert_eq!(pools.len(), 3);
        assert_eq!(weights[0], I256::try_from(5000).unwrap());
        assert_eq!(weights[1], I256::try_from(2550).unwrap());
        assert_eq!(weights[2], I256::try_from(-2450).unwrap());
    }

    #[test]
    fn test_prepare_votes_filters_zero_entries() {
        let (pools, weights) =
            prepare_votes(&[input(1, "0"), input(2, "100"), input(3, "0.00")]).unwrap();
        assert_eq!(pools, vec![Address::with_last_byte(2)]);
        assert_eq!(weights, vec![I256::try_from(10000).unwrap()]);
    }

    #[test]
    fn test_prepare_votes_rejects_all_zero() {
        assert!(prepare_votes(&[input(1, "0"), input(2, "0")]).is_err());
        assert!(prepare_votes(&[]).is_err());
    }

    #[test]
    fn test_prepare_votes_rejects_garbage() {
        assert!(prepare_votes(&[input(1, "lots")]).is_err());
    }
}

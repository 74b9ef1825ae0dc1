/*
[INPUT]:  WallKeeper, reference connection, independent PriceFeed, WorkerControl flags
[OUTPUT]: PegWallBot run loop - 30s reconciliation ticks driving reset/shutdown
[POS]:    Strategy layer - per (exchange, unit) control loop
[UPDATE]: When changing tick cadence, deviation thresholds or pause/stop transitions
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pegwall_adapter::{
    Credentials, ExchangeAdapter, ExchangeId, PriceFeed, ReferenceConnection, UnitPair,
    fetch_price,
};

use crate::config::Tuning;
use crate::coordination::Coordinator;
use crate::error::{BotError, Interrupted, interruptible};
use crate::keeper::{KeeperSettings, WallKeeper};
use crate::pricing::deviation;
use crate::reset::ResetSummary;

/// Externally settable run flags of one control loop.
#[derive(Debug)]
pub struct WorkerControl {
    active: AtomicBool,
    paused: AtomicBool,
    wake: Notify,
}

impl WorkerControl {
    pub fn new(paused: bool) -> Self {
        Self {
            active: AtomicBool::new(true),
            paused: AtomicBool::new(paused),
            wake: Notify::new(),
        }
    }

    /// Ask the loop to exit; wakes a pending tick sleep.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl Default for WorkerControl {
    fn default() -> Self {
        Self::new(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    Paused,
    Stopped,
}

/// What a tick does in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Quote,
    Withdraw,
    Exit,
}

impl LoopState {
    /// Transition evaluated at the top of every tick.
    pub fn next(self, active: bool, paused: bool) -> LoopState {
        match (self, active, paused) {
            (LoopState::Stopped, _, _) => LoopState::Stopped,
            (_, false, _) => LoopState::Stopped,
            (_, true, true) => LoopState::Paused,
            (_, true, false) => LoopState::Running,
        }
    }

    /// Paused keeps withdrawing every tick instead of leaving the loop.
    pub fn action(self) -> TickAction {
        match self {
            LoopState::Starting | LoopState::Running => TickAction::Quote,
            LoopState::Paused => TickAction::Withdraw,
            LoopState::Stopped => TickAction::Exit,
        }
    }
}

/// Result of one running tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Reference price could not be read; nothing was touched.
    PriceUnavailable,
    /// Reference and feed disagree; walls were withdrawn.
    Untrustworthy {
        reference: Decimal,
        feed: Decimal,
        deviation: Decimal,
    },
    Reset { cancelled: bool, summary: ResetSummary },
}

/// Collaborators of one bot, as assembled by the caller.
pub struct BotParts {
    pub exchange: Arc<dyn ExchangeAdapter>,
    pub credentials: Credentials,
    pub units: UnitPair,
    pub spread: Decimal,
    pub reference: Arc<dyn ReferenceConnection>,
    pub feed: Arc<dyn PriceFeed>,
}

/// Control loop keeping bid/ask walls around the reference price of one unit.
pub struct PegWallBot {
    keeper: WallKeeper,
    feed: Arc<dyn PriceFeed>,
    control: Arc<WorkerControl>,
    tick: Duration,
    sanity_threshold: Decimal,
    reset_threshold: Decimal,
    price_trials: u32,
    startup_price_trials: u32,
    state: LoopState,
    server_price: Decimal,
    prev_price: Decimal,
}

impl std::fmt::Debug for PegWallBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PegWallBot")
            .field("keeper", &self.keeper)
            .field("state", &self.state)
            .field("server_price", &self.server_price)
            .field("prev_price", &self.prev_price)
            .finish_non_exhaustive()
    }
}

impl PegWallBot {
    pub fn new(
        parts: BotParts,
        tuning: &Tuning,
        coordinator: Arc<Coordinator>,
        interrupt: CancellationToken,
        control: Arc<WorkerControl>,
    ) -> Self {
        let keeper = WallKeeper::new(
            parts.exchange,
            parts.credentials,
            parts.units,
            parts.spread,
            coordinator,
            parts.reference,
            interrupt,
            KeeperSettings::from(tuning),
        );
        Self {
            keeper,
            feed: parts.feed,
            control,
            tick: tuning.tick(),
            sanity_threshold: tuning.sanity_threshold,
            reset_threshold: tuning.reset_threshold,
            price_trials: tuning.price_trials,
            startup_price_trials: tuning.startup_price_trials,
            state: LoopState::Starting,
            server_price: Decimal::ZERO,
            prev_price: Decimal::ZERO,
        }
    }

    pub fn control(&self) -> Arc<WorkerControl> {
        self.control.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn exchange_id(&self) -> &ExchangeId {
        self.keeper.exchange_id()
    }

    pub fn units(&self) -> &UnitPair {
        self.keeper.units()
    }

    pub fn server_price(&self) -> Decimal {
        self.server_price
    }

    pub fn prev_price(&self) -> Decimal {
        self.prev_price
    }

    /// Run the loop until stopped. Invoked once per bot lifetime.
    ///
    /// Walls are withdrawn once more on exit. An interrupt returns at once
    /// without that final withdrawal.
    pub async fn run(&mut self) -> Result<(), BotError> {
        info!(
            exchange = %self.exchange_id(),
            units = %self.units(),
            tick = ?self.tick,
            "wall keeper starting"
        );

        let started = Instant::now();
        if let Err(err) = self.start().await {
            self.state = LoopState::Stopped;
            return Err(err);
        }

        let result = self.tick_loop(started.elapsed()).await;
        if let Err(BotError::Interrupted(_)) = result {
            self.state = LoopState::Stopped;
            return result;
        }
        if let Err(err) = &result {
            error!(exchange = %self.exchange_id(), unit = %self.units().quote_unit, error = %err, "control loop failed");
        }

        let withdrawn = self.shutdown().await;
        self.state = LoopState::Stopped;
        info!(exchange = %self.exchange_id(), unit = %self.units().quote_unit, "wall keeper stopped");
        withdrawn?;
        result
    }

    /// Withdraw all walls of this bot.
    pub async fn shutdown(&self) -> Result<bool, Interrupted> {
        self.keeper.shutdown().await
    }

    /// Warm the interest cache, read the first price and place the initial walls.
    async fn start(&mut self) -> Result<(), BotError> {
        self.keeper.refresh_interest().await?;

        let price = interruptible(
            &self.keeper.interrupt,
            fetch_price(
                self.keeper.reference.as_ref(),
                &self.keeper.units.quote_unit,
                self.startup_price_trials,
            ),
        )
        .await?
        .map_err(BotError::Startup)?;

        self.server_price = price;
        self.keeper.reset(true, price).await?;
        self.prev_price = price;
        Ok(())
    }

    async fn tick_loop(&mut self, mut elapsed: Duration) -> Result<(), BotError> {
        loop {
            self.wait_tick(self.tick.saturating_sub(elapsed)).await?;
            let started = Instant::now();

            self.state = self
                .state
                .next(self.control.is_active(), self.control.is_paused());
            match self.state.action() {
                TickAction::Exit => return Ok(()),
                TickAction::Withdraw => {
                    info!(exchange = %self.exchange_id(), unit = %self.units().quote_unit, "paused; withdrawing walls");
                    self.keeper.shutdown().await?;
                }
                TickAction::Quote => {
                    self.quote_tick().await?;
                }
            }

            elapsed = started.elapsed();
        }
    }

    async fn wait_tick(&self, wait: Duration) -> Result<(), Interrupted> {
        tokio::select! {
            biased;
            _ = self.keeper.interrupt.cancelled() => Err(Interrupted),
            _ = self.control.wake.notified() => Ok(()),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    /// One reconciliation tick while running.
    pub(crate) async fn quote_tick(&mut self) -> Result<TickOutcome, BotError> {
        let unit = self.keeper.units.quote_unit.clone();
        let fetched = interruptible(
            &self.keeper.interrupt,
            fetch_price(self.keeper.reference.as_ref(), &unit, self.price_trials),
        )
        .await?;
        let price = match fetched {
            Ok(price) => price,
            Err(err) => {
                warn!(exchange = %self.exchange_id(), unit = %unit, error = %err, "reference price unavailable; skipping tick");
                return Ok(TickOutcome::PriceUnavailable);
            }
        };
        self.server_price = price;

        self.keeper.refresh_interest().await?;
        let feed_price = interruptible(&self.keeper.interrupt, self.feed.price(&unit))
            .await?
            .map_err(BotError::Feed)?;

        let gap = deviation(price, feed_price);
        if gap > self.sanity_threshold {
            error!(
                exchange = %self.exchange_id(),
                unit = %unit,
                reference = %price,
                feed = %feed_price,
                deviation = %gap,
                "reference price deviates from feed; withdrawing walls"
            );
            self.keeper.shutdown().await?;
            return Ok(TickOutcome::Untrustworthy {
                reference: price,
                feed: feed_price,
                deviation: gap,
            });
        }

        let moved = deviation(self.prev_price, price);
        let cancel = moved > self.reset_threshold;
        if cancel {
            info!(
                exchange = %self.exchange_id(),
                unit = %unit,
                prev = %self.prev_price,
                price = %price,
                deviation = %moved,
                "price moved; replacing walls"
            );
            self.prev_price = price;
        }

        let summary = self.keeper.reset(cancel, price).await?;
        Ok(TickOutcome::Reset {
            cancelled: cancel,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pegwall_adapter::{ExchangeError, StaticPriceFeed};

    use crate::testing::{Call, MockExchange, MockReference, dec};

    struct Harness {
        exchange: Arc<MockExchange>,
        reference: Arc<MockReference>,
        feed: Arc<StaticPriceFeed>,
        interrupt: CancellationToken,
        bot: PegWallBot,
    }

    fn harness(paused: bool) -> Harness {
        let exchange = Arc::new(
            MockExchange::new("paper")
                .with_balance("usd", "1000")
                .with_balance("nbt", "1000"),
        );
        let reference = Arc::new(MockReference::with_price("usd", "100.00000000"));
        let feed = Arc::new(StaticPriceFeed::new([("usd", dec("100.00000000"))]));
        let interrupt = CancellationToken::new();
        let bot = PegWallBot::new(
            BotParts {
                exchange: exchange.clone(),
                credentials: Credentials::new("key", "secret"),
                units: UnitPair::new("usd", "nbt"),
                spread: dec("0.002"),
                reference: reference.clone(),
                feed: feed.clone(),
            },
            &Tuning::default(),
            Arc::new(Coordinator::default()),
            interrupt.clone(),
            Arc::new(WorkerControl::new(paused)),
        );
        Harness {
            exchange,
            reference,
            feed,
            interrupt,
            bot,
        }
    }

    #[test]
    fn transitions() {
        use LoopState::*;
        assert_eq!(Starting.next(true, false), Running);
        assert_eq!(Running.next(true, true), Paused);
        assert_eq!(Paused.next(true, true), Paused);
        assert_eq!(Paused.next(true, false), Running);
        assert_eq!(Running.next(false, false), Stopped);
        assert_eq!(Paused.next(false, true), Stopped);
        assert_eq!(Stopped.next(true, false), Stopped);

        assert_eq!(Running.action(), TickAction::Quote);
        assert_eq!(Paused.action(), TickAction::Withdraw);
        assert_eq!(Stopped.action(), TickAction::Exit);
    }

    #[tokio::test(start_paused = true)]
    async fn start_places_initial_walls_and_records_price() {
        let mut h = harness(false);
        h.bot.start().await.unwrap();

        assert_eq!(h.bot.prev_price(), dec("100"));
        assert_eq!(h.bot.server_price(), dec("100"));
        assert_eq!(h.exchange.count(Call::is_cancel), 1);
        assert_eq!(h.exchange.count(Call::is_place), 2);
        // Interest warm-up precedes the first price read.
        assert_eq!(h.reference.requests()[0], ("exchanges".to_string(), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn startup_without_price_fails_without_touching_orders() {
        let mut h = harness(false);
        h.reference.set_price("usd", None);

        let err = h.bot.run().await.unwrap_err();
        assert!(matches!(err, BotError::Startup(_)));
        assert!(h.exchange.calls().is_empty());
        assert_eq!(h.bot.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn small_feed_gap_passes_sanity_check() {
        let mut h = harness(false);
        h.bot.start().await.unwrap();
        h.exchange.clear_calls();
        h.feed.set("usd", dec("100.40000000"));

        let outcome = h.bot.quote_tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Reset { cancelled: false, .. }));
        assert_eq!(h.exchange.count(Call::is_cancel), 0);
        assert_eq!(h.exchange.count(Call::is_place), 2);
        assert_eq!(h.bot.prev_price(), dec("100"));
    }

    #[tokio::test(start_paused = true)]
    async fn large_feed_gap_withdraws_and_skips_reset() {
        let mut h = harness(false);
        h.bot.start().await.unwrap();
        h.exchange.clear_calls();
        h.feed.set("usd", dec("95.00000000"));

        let outcome = h.bot.quote_tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Untrustworthy {
                reference: dec("100"),
                feed: dec("95"),
                deviation: dec("0.05"),
            }
        );
        assert_eq!(h.exchange.calls(), vec![Call::Cancel("usd".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn moved_price_updates_prev_and_cancels() {
        let mut h = harness(false);
        h.bot.start().await.unwrap();
        h.exchange.clear_calls();
        h.reference.set_price("usd", Some("100.50000000"));
        h.feed.set("usd", dec("100.50000000"));

        let outcome = h.bot.quote_tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Reset { cancelled: true, .. }));
        assert_eq!(h.bot.prev_price(), dec("100.5"));
        assert_eq!(h.exchange.calls()[0], Call::Cancel("usd".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_price_skips_tick() {
        let mut h = harness(false);
        h.bot.start().await.unwrap();
        h.exchange.clear_calls();
        h.reference.set_price("usd", None);

        let outcome = h.bot.quote_tick().await.unwrap();
        assert_eq!(outcome, TickOutcome::PriceUnavailable);
        assert!(h.exchange.calls().is_empty());
        assert!(h.reference.requests().contains(&("price/usd".to_string(), 3)));
    }

    #[tokio::test(start_paused = true)]
    async fn feed_failure_propagates() {
        let mut h = harness(false);
        h.bot.start().await.unwrap();
        h.bot.feed = Arc::new(StaticPriceFeed::default());

        let err = h.bot.quote_tick().await.unwrap_err();
        assert!(matches!(err, BotError::Feed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_loop_withdraws_every_tick_until_stopped() {
        let h = harness(false);
        let exchange = h.exchange.clone();
        let mut bot = h.bot;
        let control = bot.control();
        let handle = tokio::spawn(async move {
            let result = bot.run().await;
            (result, bot.state())
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(exchange.count(Call::is_place), 2);

        control.pause();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(exchange.count(Call::is_cancel), 2);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(exchange.count(Call::is_cancel), 3);
        assert_eq!(exchange.count(Call::is_place), 2);

        control.stop();
        let (result, state) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(state, LoopState::Stopped);
        // Final withdrawal on exit.
        assert_eq!(exchange.count(Call::is_cancel), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn resumed_loop_quotes_again() {
        let h = harness(true);
        let exchange = h.exchange.clone();
        let mut bot = h.bot;
        let control = bot.control();
        let handle = tokio::spawn(async move { bot.run().await });

        // Initial reset happens even when starting paused.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(exchange.count(Call::is_place), 2);
        assert_eq!(exchange.count(Call::is_cancel), 2);

        control.resume();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(exchange.count(Call::is_place), 4);

        control.stop();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_cadence_compensates_for_slow_iterations() {
        let h = harness(false);
        let exchange = h.exchange.clone();
        let mut bot = h.bot;
        let control = bot.control();
        // One local fault during the first tick costs 5s of retry delay.
        let handle = tokio::spawn(async move { bot.run().await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        exchange.fail_balance(ExchangeError::fault("timeout"));

        // Tick 1 at 30s runs until 35s; tick 2 still lands at 60s.
        tokio::time::sleep(Duration::from_secs(58)).await;
        assert_eq!(exchange.count(Call::is_place), 4);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(exchange.count(Call::is_place), 6);

        control.stop();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_ends_run_without_final_shutdown() {
        let h = harness(false);
        let exchange = h.exchange.clone();
        let interrupt = h.interrupt.clone();
        let mut bot = h.bot;
        let handle = tokio::spawn(async move { bot.run().await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        interrupt.cancel();
        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_interrupted());
        assert_eq!(exchange.count(Call::is_cancel), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn public_shutdown_cancels_orders() {
        let h = harness(false);
        assert_eq!(h.bot.shutdown().await, Ok(true));
        assert_eq!(h.exchange.calls(), vec![Call::Cancel("usd".into())]);
    }
}

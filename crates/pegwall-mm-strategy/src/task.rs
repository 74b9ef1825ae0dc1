/*
[INPUT]:  BotConfig (or pre-built BotParts), shared Coordinator, global interrupt token
[OUTPUT]: Tokio tasks running one PegWallBot each, with pause/resume/stop and bounded shutdown
[POS]:    Execution layer - per-bot supervision
[UPDATE]: When changing startup/shutdown guarantees or supervision semantics
*/

use std::collections::HashMap;
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use pegwall_adapter::{
    ClientConfig, Credentials, ExchangeAdapter, HttpPriceFeed, PaperExchange, PriceFeed,
    ReferenceClient, ReferenceConnection, UnitPair,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{BotConfig, ExchangeConfig, ExchangeKind, Tuning};
use crate::coordination::Coordinator;
use crate::error::BotError;
use crate::strategy::{BotParts, PegWallBot, WorkerControl};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

static PANIC_HOOK_ONCE: Once = Once::new();

fn ensure_panic_hook_installed() {
    PANIC_HOOK_ONCE.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!("panic in task: {info}");
            previous(info);
        }));
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRuntimeStatus {
    Running,
    Paused,
    Finished,
}

#[derive(Debug)]
struct ManagedTask {
    uuid: Uuid,
    control: Arc<WorkerControl>,
    handle: JoinHandle<Result<(), BotError>>,
}

impl ManagedTask {
    fn status(&self) -> TaskRuntimeStatus {
        if self.handle.is_finished() {
            TaskRuntimeStatus::Finished
        } else if self.control.is_paused() {
            TaskRuntimeStatus::Paused
        } else {
            TaskRuntimeStatus::Running
        }
    }
}

/// Task manager that supervises every wall keeping bot of the process.
#[derive(Debug)]
pub struct TaskManager {
    tasks: HashMap<String, ManagedTask>,
    coordinator: Arc<Coordinator>,
    interrupt: CancellationToken,
}

impl TaskManager {
    /// Create a task manager on the process-wide coordinator.
    pub fn new() -> Self {
        Self::with_coordinator(Coordinator::global())
    }

    pub fn with_coordinator(coordinator: Arc<Coordinator>) -> Self {
        Self {
            tasks: HashMap::new(),
            coordinator,
            interrupt: CancellationToken::new(),
        }
    }

    /// Token that unwinds every bot immediately, skipping final withdrawal.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tasks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn runtime_status(&self, task_id: &str) -> Option<TaskRuntimeStatus> {
        self.tasks.get(task_id).map(ManagedTask::status)
    }

    pub fn runtime_status_snapshot(&self) -> HashMap<String, TaskRuntimeStatus> {
        self.tasks
            .iter()
            .map(|(task_id, task)| (task_id.clone(), task.status()))
            .collect()
    }

    pub fn all_finished(&self) -> bool {
        self.tasks.values().all(|task| task.handle.is_finished())
    }

    /// Build collaborators from configuration and spawn one bot per entry.
    pub fn spawn_from_config(&mut self, config: &BotConfig) -> Result<()> {
        ensure_panic_hook_installed();

        let reference: Arc<dyn ReferenceConnection> = Arc::new(
            ReferenceClient::with_config(
                &config.reference.url,
                client_config(config.reference.timeout_secs),
            )
            .map_err(|err| anyhow!("create reference client failed: {err}"))?,
        );
        let feed: Arc<dyn PriceFeed> = Arc::new(
            HttpPriceFeed::with_config(
                &config.feed.url_template,
                client_config(config.feed.timeout_secs),
            )
            .map_err(|err| anyhow!("create price feed failed: {err}"))?
            .with_trials(config.feed.trials),
        );

        // One adapter per venue so bots on it share identity and balances.
        let exchanges: HashMap<&str, Arc<dyn ExchangeAdapter>> = config
            .exchanges
            .iter()
            .map(|exchange| (exchange.name.as_str(), build_exchange(exchange)))
            .collect();

        for bot in &config.bots {
            let exchange = exchanges
                .get(bot.exchange.as_str())
                .cloned()
                .ok_or_else(|| anyhow!("exchange not found for bot_id={}", bot.id))?;
            let account = config
                .account(&bot.account_id)
                .ok_or_else(|| anyhow!("account_id not found for bot_id={}", bot.id))?;
            let peg_unit = config
                .exchange(&bot.exchange)
                .map(|e| e.peg_unit.clone())
                .unwrap_or_default();

            let parts = BotParts {
                exchange,
                credentials: Credentials::new(account.key.clone(), account.secret.clone()),
                units: UnitPair::new(bot.unit.clone(), peg_unit),
                spread: bot.spread,
                reference: reference.clone(),
                feed: feed.clone(),
            };
            self.spawn_bot(&bot.id, parts, &config.tuning, bot.paused)
                .with_context(|| format!("spawn bot_id={}", bot.id))?;
        }

        Ok(())
    }

    /// Spawn a bot from pre-built collaborators.
    pub fn spawn_bot(
        &mut self,
        task_id: &str,
        parts: BotParts,
        tuning: &Tuning,
        paused: bool,
    ) -> Result<()> {
        if self.tasks.contains_key(task_id) {
            return Err(anyhow!("duplicate task_id: {task_id}"));
        }

        let control = Arc::new(WorkerControl::new(paused));
        let mut bot = PegWallBot::new(
            parts,
            tuning,
            self.coordinator.clone(),
            self.interrupt.clone(),
            control.clone(),
        );
        let uuid = Uuid::new_v4();
        let id = task_id.to_string();

        let handle = tokio::spawn(async move {
            tracing::info!(task_uuid = %uuid, task_id = %id, "task starting");
            let result = bot.run().await;
            match &result {
                Ok(()) => tracing::info!(task_uuid = %uuid, task_id = %id, "task finished"),
                Err(err) if err.is_interrupted() => {
                    tracing::warn!(task_uuid = %uuid, task_id = %id, "task interrupted")
                }
                Err(err) => {
                    tracing::error!(task_uuid = %uuid, task_id = %id, error = %err, "task failed")
                }
            }
            result
        });

        self.tasks.insert(
            task_id.to_string(),
            ManagedTask {
                uuid,
                control,
                handle,
            },
        );
        Ok(())
    }

    pub fn pause(&self, task_id: &str) -> Result<()> {
        self.control(task_id)?.pause();
        tracing::info!(task_id = %task_id, "task paused");
        Ok(())
    }

    pub fn resume(&self, task_id: &str) -> Result<()> {
        self.control(task_id)?.resume();
        tracing::info!(task_id = %task_id, "task resumed");
        Ok(())
    }

    fn control(&self, task_id: &str) -> Result<&WorkerControl> {
        self.tasks
            .get(task_id)
            .map(|task| task.control.as_ref())
            .ok_or_else(|| anyhow!("task_id not found: {task_id}"))
    }

    pub async fn stop_task(&mut self, task_id: &str) -> Result<()> {
        let Some(task) = self.tasks.remove(task_id) else {
            return Err(anyhow!("task_id not found: {task_id}"));
        };

        task.control.stop();

        let mut handle = task.handle;
        let sleep = tokio::time::sleep_until(Instant::now() + SHUTDOWN_TIMEOUT);

        tokio::select! {
            res = &mut handle => join_result(task_id, task.uuid, res),
            _ = sleep => {
                handle.abort();
                Err(anyhow!("stop_task timed out after {SHUTDOWN_TIMEOUT:?} task_id={task_id}"))
            }
        }
    }

    /// Ask every bot to stop.
    pub fn request_stop_all(&self) {
        for task in self.tasks.values() {
            task.control.stop();
        }
    }

    /// Request graceful shutdown and wait for all tasks to exit.
    ///
    /// Bounded at 30s; past that the interrupt fires and remaining tasks are aborted.
    pub async fn shutdown_and_wait(&mut self) -> Result<()> {
        self.request_stop_all();
        self.join_all_with_deadline(SHUTDOWN_TIMEOUT).await
    }

    async fn join_all_with_deadline(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        // Drain handles so we can abort remaining ones on timeout.
        let mut tasks: Vec<(String, ManagedTask)> =
            std::mem::take(&mut self.tasks).into_iter().collect();
        let mut first_error = None;

        while let Some((task_id, task)) = tasks.pop() {
            let mut handle = task.handle;
            let sleep = tokio::time::sleep_until(deadline);

            tokio::select! {
                res = &mut handle => {
                    if let Err(err) = join_result(&task_id, task.uuid, res) {
                        tracing::error!(task_id = %task_id, error = %err, "task ended with error");
                        first_error.get_or_insert(err);
                    }
                }
                _ = sleep => {
                    self.interrupt.cancel();
                    handle.abort();
                    abort_all(tasks);
                    return Err(anyhow!("shutdown timed out after {timeout:?}"));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

fn client_config(timeout_secs: u64) -> ClientConfig {
    ClientConfig {
        timeout: Duration::from_secs(timeout_secs),
        ..ClientConfig::default()
    }
}

fn build_exchange(config: &ExchangeConfig) -> Arc<dyn ExchangeAdapter> {
    match config.kind {
        ExchangeKind::Paper => Arc::new(
            PaperExchange::new(config.name.clone(), config.peg_unit.clone())
                .with_balances(config.balances.iter().map(|(unit, amount)| (unit.clone(), *amount))),
        ),
    }
}

fn join_result(
    task_id: &str,
    uuid: Uuid,
    res: Result<Result<(), BotError>, tokio::task::JoinError>,
) -> Result<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) if err.is_interrupted() => Ok(()),
        Ok(Err(err)) => {
            Err(anyhow!(err)).with_context(|| format!("task returned error task_id={task_id} task_uuid={uuid}"))
        }
        Err(join_err) => {
            if join_err.is_panic() {
                return Err(anyhow!("task panicked task_id={task_id}: {join_err}"));
            }
            Err(anyhow!("task join error task_id={task_id}: {join_err}"))
        }
    }
}

fn abort_all(tasks: Vec<(String, ManagedTask)>) {
    for (_, task) in tasks {
        task.handle.abort();
    }
}

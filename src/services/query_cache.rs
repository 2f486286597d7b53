use crate::config::{Config, QueryPolicy};
use crate::debug_if_enabled;
use crate::error::{DecodeError, QueryError};
use crate::model::QueryKind;
use crate::services::decoder::decode;
use crate::services::gateway::{build_env_overrides, Invocation, ProcessGateway};
use crate::utils::Clock;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>, QueryError>>>;

/// Состояние слота кэша для одного вида запроса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Ничего не загружено и запрос не идёт
    Idle,
    /// Запрос выполняется
    Fetching,
    /// Данные моложе TTL
    Fresh,
    /// Данные есть, но устарели или сброшены вручную
    Stale,
}

struct CacheSlot<T> {
    data: Option<Arc<T>>,
    // Поколение запроса, который положил `data`
    data_generation: u64,
    fetched_at: Option<u64>,
    in_flight: Option<SharedFetch<T>>,
    // Растёт при каждом invalidate(); запрос, начатый раньше, не делает слот свежим
    generation: u64,
}

impl<T> Default for CacheSlot<T> {
    fn default() -> Self {
        Self {
            data: None,
            data_generation: 0,
            fetched_at: None,
            in_flight: None,
            generation: 0,
        }
    }
}

/// TTL-кэш одного вида запроса с объединением параллельных запросов.
///
/// Пока запрос выполняется, все вызывающие получают один и тот же результат:
/// второй процесс не запускается. Начатый запрос никогда не отменяется,
/// даже если все ожидающие ушли; его результат попадёт в кэш.
pub struct QueryCache<T> {
    kind: QueryKind,
    invocation: Invocation,
    gateway: Arc<dyn ProcessGateway>,
    clock: Arc<dyn Clock>,
    policy: QueryPolicy,
    slot: Arc<Mutex<CacheSlot<T>>>,
}

/// Команда запроса из конфигурации вместе с окружением пользователя сессии.
pub fn invocation_for(config: &Config, kind: QueryKind) -> Invocation {
    let mut env = build_env_overrides();
    env.extend(config.query.env.clone());
    Invocation::new(config.query.command.clone(), config.args_for(kind)).with_env(env)
}

impl<T> QueryCache<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        kind: QueryKind,
        invocation: Invocation,
        gateway: Arc<dyn ProcessGateway>,
        clock: Arc<dyn Clock>,
        policy: QueryPolicy,
    ) -> Self {
        Self {
            kind,
            invocation,
            gateway,
            clock,
            policy,
            slot: Arc::new(Mutex::new(CacheSlot::default())),
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub async fn query(&self) -> Result<Arc<T>, QueryError> {
        let pending = {
            let mut slot = self.slot.lock();

            if let Some(data) = self.fresh_data(&slot) {
                debug_if_enabled!("Кэш {} свежий, процесс не запускаем", self.kind);
                return Ok(data);
            }

            let in_flight = slot.in_flight.clone();
            match in_flight {
                Some(in_flight) => {
                    debug_if_enabled!("Присоединяемся к уже идущему запросу {}", self.kind);
                    in_flight
                }
                None => {
                    let fetch = self.start_fetch(slot.generation);
                    slot.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        pending.await
    }

    pub fn state(&self) -> CacheState {
        let slot = self.slot.lock();
        if slot.in_flight.is_some() {
            CacheState::Fetching
        } else if slot.data.is_none() {
            CacheState::Idle
        } else if self.fresh_data(&slot).is_some() {
            CacheState::Fresh
        } else {
            CacheState::Stale
        }
    }

    /// Последнее полученное значение, даже устаревшее
    pub fn cached(&self) -> Option<Arc<T>> {
        self.slot.lock().data.clone()
    }

    /// Следующий запрос пойдёт в процесс; идущий запрос не прерывается.
    ///
    /// An in-flight fetch keeps running for the callers already waiting on it,
    /// but its result no longer counts as fresh and new callers start a new
    /// fetch.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        let detached = slot.in_flight.take().is_some();
        if slot.fetched_at.take().is_some() || detached {
            debug_if_enabled!(
                "Кэш {} сброшен вручную (поколение {})",
                self.kind,
                slot.generation
            );
        }
    }

    fn fresh_data(&self, slot: &CacheSlot<T>) -> Option<Arc<T>> {
        let fetched_at = slot.fetched_at?;
        let age = self.clock.now_millis().saturating_sub(fetched_at);
        if u128::from(age) < self.policy.ttl.as_millis() {
            slot.data.clone()
        } else {
            None
        }
    }

    /// Called with the slot locked; `generation` is the slot's current one.
    fn start_fetch(&self, generation: u64) -> SharedFetch<T> {
        let kind = self.kind;
        let gateway = Arc::clone(&self.gateway);
        let clock = Arc::clone(&self.clock);
        let invocation = self.invocation.clone();
        let policy = self.policy.clone();
        let slot = Arc::clone(&self.slot);

        let handle = tokio::spawn(async move {
            let result = fetch_with_retry::<T>(gateway.as_ref(), &invocation, &policy).await;

            let mut slot = slot.lock();
            let current = slot.generation == generation;
            if current {
                slot.in_flight = None;
            }

            match result {
                Ok(value) => {
                    let value = Arc::new(value);
                    if generation >= slot.data_generation {
                        slot.data = Some(Arc::clone(&value));
                        slot.data_generation = generation;
                    }
                    if current {
                        slot.fetched_at = Some(clock.now_millis());
                    } else {
                        debug_if_enabled!("Запрос {} завершился после сброса кэша", kind);
                    }
                    Ok(value)
                }
                Err(error) => match &slot.data {
                    Some(stale) => {
                        warn!("Запрос {} не удался, отдаём устаревшие данные: {}", kind, error);
                        Ok(Arc::clone(stale))
                    }
                    None => {
                        info!("Запрос {} не удался, кэша нет: {}", kind, error);
                        Err(error)
                    }
                },
            }
        });

        let slot = Arc::clone(&self.slot);
        handle
            .map(move |joined| {
                joined.unwrap_or_else(|e| {
                    // Задача упала до того, как сняла отметку о запросе
                    let mut slot = slot.lock();
                    if slot.generation == generation {
                        slot.in_flight = None;
                    }
                    Err(QueryError::Aborted(e.to_string()))
                })
            })
            .boxed()
            .shared()
    }
}

/// Один запрос с ограниченным повтором при неполном выводе.
///
/// Повторяется только `IncompleteOutput`; ошибки процесса и разбора сразу
/// завершают попытку.
pub async fn fetch_with_retry<T: DeserializeOwned>(
    gateway: &dyn ProcessGateway,
    invocation: &Invocation,
    policy: &QueryPolicy,
) -> Result<T, QueryError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let output = gateway.execute(invocation).await?;

        match decode::<T>(&output.stdout) {
            Ok(value) => return Ok(value),
            Err(DecodeError::IncompleteOutput) if attempt < max_attempts => {
                debug_if_enabled!(
                    "Неполный вывод {} (попытка {}/{}), повтор через {:?}",
                    invocation.display(),
                    attempt,
                    max_attempts,
                    policy.retry_delay
                );
                sleep(policy.retry_delay).await;
            }
            Err(DecodeError::IncompleteOutput) => {
                return Err(QueryError::IncompleteOutput { attempts: attempt })
            }
            Err(DecodeError::Parse(message)) => return Err(QueryError::Parse(message)),
        }
    }
}

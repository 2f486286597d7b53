//! Движок переключателя недавних окон.
//!
//! Запросы к оконному менеджеру идут через внешний процесс и кэшируются,
//! история фокуса из двух источников сливается в одну метку времени,
//! а поиск сочетает фильтр по дисплею, точное и нечёткое совпадение.

pub mod config;
pub mod error;
pub mod model;
pub mod search;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{QueryError, Result, WinpickError};
pub use services::WindowSwitcher;

use thiserror::Error;

/// Ошибка запуска внешней команды.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Не удалось запустить '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("'{command}' завершился с кодом {exit_code:?}: {stderr}")]
    Exit {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("'{command}' не ответил за {timeout_ms}мс")]
    Timeout { command: String, timeout_ms: u64 },
}

/// Результат разбора сырого вывода, отличающий "ещё пишется" от "сломано".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Вывод обрезан: процесс ещё не дописал JSON")]
    IncompleteOutput,

    #[error("Некорректный JSON: {0}")]
    Parse(String),
}

/// Ошибка запроса к оконному менеджеру, видимая вызывающему коду.
///
/// `Clone`, потому что один и тот же результат выдаётся всем ожидающим
/// одного запроса.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Вывод остался неполным после {attempts} попыток")]
    IncompleteOutput { attempts: u32 },

    #[error("Ошибка разбора ответа: {0}")]
    Parse(String),

    #[error("Запрос прерван: {0}")]
    Aborted(String),
}

/// Ошибка локального состояния: журнал фокуса и хранилище использования.
#[derive(Error, Debug)]
pub enum WinpickError {
    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ошибка хранилища: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, WinpickError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! winpick_error {
    (store, $($arg:tt)*) => {
        $crate::error::WinpickError::Store(format!($($arg)*))
    };
}

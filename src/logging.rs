//! Structured logging macros shared by every layer of the service.
//!
//! Each macro fixes the `operation` field and the message prefix for its layer
//! and forwards any trailing `name = value` pairs as display-formatted fields.
//! Use `paper_id`, `user_id` and `question_id` for identifiers.

// ============================================================================
// API handlers
// ============================================================================

#[macro_export]
macro_rules! log_api_start {
    ($operation:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(operation = $operation, $($field = %$value,)* "API operation started")
    };
}

#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(operation = $operation, $($field = %$value,)* "API operation completed: {}", $msg)
    };
}

#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::warn!(operation = $operation, $($field = %$value,)* "API operation warning: {}", $msg)
    };
}

#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::error!(operation = $operation, $($field = %$value,)* "API operation failed: {}", $msg)
    };
}

// ============================================================================
// Service layer
// ============================================================================

#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(
            service = $service,
            operation = $operation,
            $($field = %$value,)*
            "Service operation started"
        )
    };
}

#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            $($field = %$value,)*
            "Service operation completed: {}", $msg
        )
    };
}

#[macro_export]
macro_rules! log_service_warn {
    ($service:expr, $operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::warn!(
            service = $service,
            operation = $operation,
            $($field = %$value,)*
            "Service operation warning: {}", $msg
        )
    };
}

#[macro_export]
macro_rules! log_service_error {
    ($service:expr, $operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::error!(
            service = $service,
            operation = $operation,
            $($field = %$value,)*
            "Service operation failed: {}", $msg
        )
    };
}

// ============================================================================
// Storage
// ============================================================================

#[macro_export]
macro_rules! log_db_operation {
    (debug, $operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(operation = $operation, $($field = %$value,)* "Database: {}", $msg)
    };
    (info, $operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(operation = $operation, $($field = %$value,)* "Database: {}", $msg)
    };
    (error, $operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::error!(operation = $operation, $($field = %$value,)* "Database operation failed: {}", $msg)
    };
}

// ============================================================================
// Completion service
// ============================================================================

#[macro_export]
macro_rules! log_llm_operation {
    (start, $operation:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(operation = $operation, $($field = %$value,)* "LLM request started")
    };
    (success, $operation:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(operation = $operation, $($field = %$value,)* "LLM request completed")
    };
    (warn, $operation:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::warn!(operation = $operation, $($field = %$value,)* "LLM warning: {}", $msg)
    };
    (error, $operation:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::error!(operation = $operation, $($field = %$value,)* "LLM request failed")
    };
}

// ============================================================================
// Process lifecycle
// ============================================================================

#[macro_export]
macro_rules! log_system_event {
    (startup, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(event = "startup", $($field = %$value,)* "{}", $msg)
    };
    (shutdown, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(event = "shutdown", $($field = %$value,)* "{}", $msg)
    };
    (config, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(event = "config", $($field = %$value,)* "{}", $msg)
    };
}

#[macro_export]
macro_rules! log_performance {
    ($operation:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(operation = $operation, $($field = %$value,)* "Performance measurement")
    };
}

#[macro_export]
macro_rules! log_validation {
    (success, $target:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(validation_target = $target, $($field = %$value,)* "Validation passed: {}", $msg)
    };
    (failure, $target:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::warn!(validation_target = $target, $($field = %$value,)* "Validation failed: {}", $msg)
    };
}

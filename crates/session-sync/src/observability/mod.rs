//! Observability for the session synchronizer.
//!
//! Every metric label is bounded by code, never by participant or track ids:
//! - `kind`: signal kinds (reaction, mute, unmute) or track kinds (audio, video)
//! - `reason`: codec failure reasons and drop causes
//! - `outcome`: device switch outcomes (switched, dropped, superseded, error)
//! - `event`: session event names
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `session_participants_active` | Gauge | none | Participants in the registry, local included |
//! | `session_signals_received_total` | Counter | `kind` | Decoded side-channel signals |
//! | `session_signals_dropped_total` | Counter | `reason` | Discarded side-channel payloads |
//! | `session_device_switch_total` | Counter | `kind`, `outcome` | Camera/microphone switch results |
//! | `session_device_switch_duration_seconds` | Histogram | `kind` | Time to acquire a new device track |
//! | `session_events_total` | Counter | `event` | Session events processed |
//! | `session_updates_dropped_total` | Counter | none | UI updates dropped on a full channel |

pub mod metrics;

pub use metrics::{
    init_metrics_recorder, record_device_switch, record_device_switch_duration,
    record_session_event, record_signal_dropped, record_signal_received, record_update_dropped,
    set_participants_active,
};

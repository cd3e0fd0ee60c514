//! Surface registration with the console.
//!
//! The console only starts sending feedback after a `/set_surface` message
//! tells it how many strips to bank, which strip types to expose and which
//! feedback streams to enable. [`SurfaceSetup`] holds those parameters;
//! [`SurfaceSetup::handshake`] renders the message.

use crate::{Message, Value};

bitflags::bitflags! {
    /// Feedback streams requested from the console.
    ///
    /// Flag names are accepted verbatim in the `[surface]` configuration
    /// section, e.g. `feedback = ["STRIP_BUTTONS", "MASTER"]`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FeedbackFlags: u32 {
        /// Button status for strips.
        const STRIP_BUTTONS    = 1 << 0;
        /// Control values for strips.
        const STRIP_VALUES     = 1 << 1;
        const SSID_AS_PATH     = 1 << 2;
        const HEARTBEAT        = 1 << 3;
        /// Master section feedback.
        const MASTER           = 1 << 4;
        const BAR_BEAT         = 1 << 5;
        const TIMECODE         = 1 << 6;
        /// Meters as dB or 0..1 depending on the gain mode.
        const METER_FADER_MODE = 1 << 7;
        /// Meters as a 16 bit LED bar. Ignored when `METER_FADER_MODE` is set.
        const METER_BITS       = 1 << 8;
        const SIGNAL_PRESENT   = 1 << 9;
        const POSITION_SAMPLES = 1 << 10;
        const POSITION_TIME    = 1 << 11;
        /// Selected channel feedback.
        const SELECT_CHANNEL   = 1 << 13;
        /// OSC 1.0 `/reply` instead of `#reply`.
        const OSC_1_REPLY      = 1 << 14;
    }
}

/// Parameters of the `/set_surface` handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSetup {
    pub bank_size: u32,
    /// Strip type mask; the default shows everything but hidden and special strips.
    pub strip_types: u32,
    pub feedback: FeedbackFlags,
    /// 2 reports faders both in dB and as a position.
    pub fader_mode: u32,
    pub send_page_size: u32,
    pub plugin_page_size: u32,
}

impl Default for SurfaceSetup {
    fn default() -> Self {
        SurfaceSetup {
            bank_size: 8,
            strip_types: 159,
            feedback: FeedbackFlags::STRIP_BUTTONS
                | FeedbackFlags::STRIP_VALUES
                | FeedbackFlags::MASTER
                | FeedbackFlags::SELECT_CHANNEL,
            fader_mode: 2,
            send_page_size: 8,
            plugin_page_size: 8,
        }
    }
}

impl SurfaceSetup {
    pub fn handshake(&self) -> Message {
        let args = [
            self.bank_size,
            self.strip_types,
            self.feedback.bits(),
            self.fader_mode,
            self.send_page_size,
            self.plugin_page_size,
        ];
        Message::new("/set_surface", args.into_iter().map(|v| Value::Int(i64::from(v))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handshake() {
        let msg = SurfaceSetup::default().handshake();
        assert_eq!(msg.address, "/set_surface");
        let ints: Vec<i64> = msg.args.iter().filter_map(Value::as_i64).collect();
        assert_eq!(ints, vec![8, 159, 1 | 2 | 16 | 8192, 2, 8, 8]);
    }

    #[test]
    fn flag_names() {
        assert_eq!(FeedbackFlags::from_name("SELECT_CHANNEL"), Some(FeedbackFlags::SELECT_CHANNEL));
        assert_eq!(FeedbackFlags::OSC_1_REPLY.bits(), 16384);
        assert_eq!(FeedbackFlags::from_name("select_channel"), None);
    }
}

//! UDS Negative Response Codes used by the gateway's own disposition logic
//! (not the full ISO 14229-1 catalog — only the codes this gateway itself
//! emits when a request cannot be routed or matched).

/// Negative Response Codes this gateway emits directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NegativeResponseCode {
    /// 0x11 — no service in the ECU's catalog matched the request.
    ServiceNotSupported = 0x11,
    /// 0x31 — no ECU (physical or functional) exists for the target address.
    RequestOutOfRange = 0x31,
    /// 0x33 — every ECU in a functional fanout rejected the tester address.
    SecurityAccessDenied = 0x33,
}

impl NegativeResponseCode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Build a UDS negative response body: `7F <SID> <NRC>`.
    pub fn response_body(self, service_id: u8) -> Vec<u8> {
        vec![0x7F, service_id, self.code()]
    }
}

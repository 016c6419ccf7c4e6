//! Fixed ids and payloads shared by the integration tests.

use bytes::Bytes;

pub const TENANT_ID: i64 = 1;
pub const OTHER_TENANT_ID: i64 = 2;

pub const BACKEND_ID: i64 = 100;
pub const SECOND_BACKEND_ID: i64 = 101;
pub const MAILER_BACKEND_ID: i64 = 102;

/// Attachment container 42 belongs to invoice 42.
pub const INVOICE_ATTACHMENT_ID: i64 = 42;
pub const INVOICE_TABLE: &str = "C_Invoice";
pub const INVOICE_RECORD_ID: i64 = 42;

/// Archive 5 belongs to order 1000017.
pub const ORDER_ARCHIVE_ID: i64 = 5;
pub const ORDER_TABLE: &str = "C_Order";
pub const ORDER_RECORD_ID: i64 = 1000017;

pub const LOGO_IMAGE_ID: i64 = 7;

pub fn invoice_pdf() -> Bytes {
    Bytes::from_static(b"%PDF-1.7 invoice 42")
}

pub fn logo_v1() -> Bytes {
    Bytes::from_static(&[0x89, b'P', b'N', b'G', 1, 1, 1])
}

pub fn logo_v2() -> Bytes {
    Bytes::from_static(&[0x89, b'P', b'N', b'G', 2, 2, 2, 2])
}

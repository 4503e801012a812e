//! Fixed replies shown to end users. None of them carries error detail.

/// The document was not a PDF.
pub const REJECTED: &str = "Please send a PDF file.";

/// The PDF had no text layer.
pub const NO_TEXT: &str = "The PDF contains no text (it may be a scan).";

/// Anything else went wrong.
pub const FAILURE: &str = "Could not process the PDF.";

/// Sent by chat transports for messages that carry no document.
pub const USAGE: &str = "Send a PDF with the Rate Confirmation.";

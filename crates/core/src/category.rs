use thiserror::Error;

/// The payment app the user tagged the receipt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpiApp {
    PhonePe,
    Paytm,
    GooglePay,
    Others,
}

impl UpiApp {
    pub const ALL: [UpiApp; 4] = [
        UpiApp::PhonePe,
        UpiApp::Paytm,
        UpiApp::GooglePay,
        UpiApp::Others,
    ];

    fn as_str(self) -> &'static str {
        match self {
            UpiApp::PhonePe => "PhonePe",
            UpiApp::Paytm => "Paytm",
            UpiApp::GooglePay => "GooglePay",
            UpiApp::Others => "Others",
        }
    }
}

impl std::fmt::Display for UpiApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown receipt category: '{0}'")]
pub struct ParseCategoryError(String);

/// Caller-supplied receipt category. Carried through the pipeline as
/// provenance only; every category runs the same extractor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptCategory {
    Upi(UpiApp),
    GstBill(UpiApp),
}

impl ReceiptCategory {
    pub fn app(self) -> UpiApp {
        match self {
            ReceiptCategory::Upi(app) | ReceiptCategory::GstBill(app) => app,
        }
    }

    pub fn is_gst_bill(self) -> bool {
        matches!(self, ReceiptCategory::GstBill(_))
    }
}

// String forms match the tags the chat layer sends: a bare app name for a
// UPI receipt, "gstbill_" + app name for a GST bill.
impl std::fmt::Display for ReceiptCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiptCategory::Upi(app) => write!(f, "{app}"),
            ReceiptCategory::GstBill(app) => write!(f, "gstbill_{app}"),
        }
    }
}

// Serialized as the same string form the chat layer uses.
impl serde::Serialize for ReceiptCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ReceiptCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for ReceiptCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (gst, app_str) = match s.strip_prefix("gstbill_") {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let app = UpiApp::ALL
            .into_iter()
            .find(|a| a.as_str() == app_str)
            .ok_or_else(|| ParseCategoryError(s.to_string()))?;
        Ok(if gst {
            ReceiptCategory::GstBill(app)
        } else {
            ReceiptCategory::Upi(app)
        })
    }
}

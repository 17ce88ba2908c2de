//! Vendor-specific metadata quirks.
//!
//! Some trail-camera vendors bury structured fields inside free-text EXIF
//! tags. Quirks run against the extracted mapping before generic enrichment,
//! so the generic pass (and the record's own identity fields) can still
//! override whatever a quirk writes.

use std::collections::BTreeMap;

/// A pre-enrichment hook for one camera vendor, selected by the extracted
/// `Make` field.
pub trait VendorQuirk: Send + Sync {
    /// The `Make` value this quirk applies to.
    fn make(&self) -> &'static str;

    /// Rewrite the extracted mapping in place.
    fn apply(&self, extracted: &mut BTreeMap<String, String>);
}

/// BuckEyeCam nests its serial number and two free-text fields inside the
/// `Comment` tag as `KEY=VALUE` lines.
pub struct BuckEyeCamQuirk;

impl VendorQuirk for BuckEyeCamQuirk {
    fn make(&self) -> &'static str {
        "BuckEyeCam"
    }

    fn apply(&self, extracted: &mut BTreeMap<String, String>) {
        let Some(comment) = extracted.get("Comment").cloned() else {
            return;
        };
        for line in comment.lines() {
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "SN" => {
                        extracted.insert("SerialNumber".to_string(), value.trim().to_string());
                    }
                    "TEXT1" => {
                        extracted.insert("text_1".to_string(), value.trim().to_string());
                    }
                    "TEXT2" => {
                        extracted.insert("text_2".to_string(), value.trim().to_string());
                    }
                    _ => {}
                }
            }
        }
    }
}

/// The quirks shipped with the pipeline.
pub fn builtin_quirks() -> Vec<Box<dyn VendorQuirk>> {
    vec![Box::new(BuckEyeCamQuirk)]
}

/// Run every quirk whose `Make` matches the extracted mapping.
pub fn apply_vendor_quirks(extracted: &mut BTreeMap<String, String>, quirks: &[Box<dyn VendorQuirk>]) {
    let Some(make) = extracted.get("Make").cloned() else {
        return;
    };
    for quirk in quirks.iter().filter(|q| q.make() == make) {
        tracing::debug!(make = %make, "Applying vendor quirk");
        quirk.apply(extracted);
    }
}

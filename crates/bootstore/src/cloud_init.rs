//! C4: RFC 7396 JSON Merge Patch over cloud-init payloads, backed by the
//! `json-patch` crate's `merge` function rather than a hand-rolled walk.

use models::CloudInit;
use serde_json::Value;

/// Applies `incoming` onto `existing` in place and reports whether anything
/// changed. Transient decode issues are impossible here since both sides are
/// already typed `CloudInit` values; any failure further upstream (e.g. a
/// corrupt stored record) is the caller's concern, not this function's.
pub fn merge_cloud_init(existing: &mut CloudInit, incoming: &CloudInit) -> bool {
    let mut changed = false;
    changed |= merge_field(&mut existing.meta_data, incoming.meta_data.as_ref());
    changed |= merge_field(&mut existing.user_data, incoming.user_data.as_ref());

    if let Some(incoming_ph) = &incoming.phone_home {
        if incoming_ph.has_any_field() && existing.phone_home.as_ref() != Some(incoming_ph) {
            existing.phone_home = Some(incoming_ph.clone());
            changed = true;
        }
    }

    changed
}

fn merge_field(existing: &mut Option<Value>, incoming: Option<&Value>) -> bool {
    let Some(patch) = incoming else {
        return false;
    };

    match existing {
        None => {
            *existing = Some(patch.clone());
            true
        }
        Some(current) => {
            let before = current.clone();
            json_patch::merge(current, patch);
            before != *current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adopts_incoming_verbatim_when_existing_is_empty() {
        let mut existing = CloudInit::default();
        let incoming = CloudInit {
            user_data: Some(json!({"a": 1})),
            ..Default::default()
        };
        assert!(merge_cloud_init(&mut existing, &incoming));
        assert_eq!(existing.user_data, Some(json!({"a": 1})));
    }

    #[test]
    fn no_change_when_incoming_is_absent() {
        let mut existing = CloudInit {
            user_data: Some(json!({"a": 1})),
            ..Default::default()
        };
        let incoming = CloudInit::default();
        assert!(!merge_cloud_init(&mut existing, &incoming));
    }

    #[test]
    fn null_removes_key_object_merges_recursively() {
        let mut existing = CloudInit {
            user_data: Some(json!({"a": 1, "b": 2})),
            ..Default::default()
        };
        let incoming = CloudInit {
            user_data: Some(json!({"b": null, "c": 3})),
            ..Default::default()
        };
        assert!(merge_cloud_init(&mut existing, &incoming));
        assert_eq!(existing.user_data, Some(json!({"a": 1, "c": 3})));
    }

    #[test]
    fn phone_home_replaced_wholesale_when_any_field_present() {
        let mut existing = CloudInit::default();
        let incoming = CloudInit {
            phone_home: Some(models::PhoneHome {
                hostname: "node0".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(merge_cloud_init(&mut existing, &incoming));
        assert_eq!(existing.phone_home.unwrap().hostname, "node0");
    }
}

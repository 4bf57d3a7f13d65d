//! Import helpers

use crate::resource::{ImportResourceRequest, ImportResourceResponse};
use crate::types::{AttributePath, Diagnostics, DynamicValue};

/// Seeds imported state with the import ID stored under `attr`, typically
/// `"id"`. The follow-up refresh fills in the remaining attributes.
pub fn import_state_passthrough_id(
    attr: &str,
    request: &ImportResourceRequest,
) -> ImportResourceResponse {
    let mut diagnostics = Diagnostics::new();
    let mut state = DynamicValue::empty_object();

    if let Err(e) = state.set_string(&AttributePath::new(attr), request.id.clone()) {
        diagnostics.add_error(
            format!("failed to set import ID onto '{}'", attr),
            e.to_string(),
        );
    }

    ImportResourceResponse { state, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_id_lands_on_requested_attribute() {
        let request = ImportResourceRequest {
            id: "/subscriptions/0000/resourceGroups/rg1".to_string(),
        };

        let response = import_state_passthrough_id("id", &request);

        assert!(!response.diagnostics.has_errors());
        assert_eq!(
            response.state.get_string(&AttributePath::new("id")).unwrap(),
            "/subscriptions/0000/resourceGroups/rg1"
        );
    }
}

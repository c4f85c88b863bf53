//! Remote administration payloads

use serde::Serialize;

use super::{parse_inner, DecodeContext, Payload};
use crate::error::Result;
use crate::port::PortNum;
use crate::proto;
use crate::proto::admin_message::PayloadVariant;

/// Administrative action seen on the air
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminReport {
    /// Action name, e.g. `get_owner_request` or `reboot_seconds`
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A session passkey accompanied the request
    pub session_passkey: bool,
}

fn describe(variant: &PayloadVariant) -> (&'static str, Option<String>) {
    match variant {
        PayloadVariant::GetChannelRequest(index) => ("get_channel_request", Some(format!("index {}", index))),
        PayloadVariant::GetOwnerRequest(_) => ("get_owner_request", None),
        PayloadVariant::GetConfigRequest(kind) => ("get_config_request", Some(format!("config type {}", kind))),
        PayloadVariant::GetModuleConfigRequest(kind) => {
            ("get_module_config_request", Some(format!("module config type {}", kind)))
        }
        PayloadVariant::GetDeviceMetadataRequest(_) => ("get_device_metadata_request", None),
        PayloadVariant::SetOwner(user) => ("set_owner", Some(format!("{} ({})", user.long_name, user.short_name))),
        PayloadVariant::SetChannel(body) => ("set_channel", Some(format!("{} bytes", body.len()))),
        PayloadVariant::SetConfig(body) => ("set_config", Some(format!("{} bytes", body.len()))),
        PayloadVariant::SetModuleConfig(body) => ("set_module_config", Some(format!("{} bytes", body.len()))),
        PayloadVariant::BeginEditSettings(_) => ("begin_edit_settings", None),
        PayloadVariant::CommitEditSettings(_) => ("commit_edit_settings", None),
        PayloadVariant::RebootOtaSeconds(secs) => ("reboot_ota_seconds", Some(format!("{}s", secs))),
        PayloadVariant::ExitSimulator(_) => ("exit_simulator", None),
        PayloadVariant::RebootSeconds(secs) => ("reboot_seconds", Some(format!("{}s", secs))),
        PayloadVariant::ShutdownSeconds(secs) => ("shutdown_seconds", Some(format!("{}s", secs))),
        PayloadVariant::FactoryResetConfig(_) => ("factory_reset_config", None),
        PayloadVariant::NodedbReset(_) => ("nodedb_reset", None),
    }
}

pub(super) fn decode_admin(bytes: &[u8], _ctx: &DecodeContext) -> Result<Payload> {
    let admin: proto::AdminMessage = parse_inner(PortNum::Admin, bytes)?;
    let (action, detail) = admin
        .payload_variant
        .as_ref()
        .map(describe)
        .unwrap_or(("unknown", None));

    Ok(Payload::Admin(AdminReport {
        action,
        detail,
        session_passkey: !admin.session_passkey.is_empty(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::NodeId;
    use prost::Message as _;
    use serde_json::json;

    fn decode(admin: proto::AdminMessage) -> Payload {
        let ctx = DecodeContext::new(NodeId::from_u32(1), NodeId::from_u32(2));
        decode_admin(&admin.encode_to_vec(), &ctx).unwrap()
    }

    #[test]
    fn test_reboot_with_passkey() {
        let payload = decode(proto::AdminMessage {
            payload_variant: Some(PayloadVariant::RebootSeconds(5)),
            session_passkey: vec![1, 2, 3, 4],
        });
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "action": "reboot_seconds", "detail": "5s", "session_passkey": true })
        );
    }

    #[test]
    fn test_set_owner() {
        let payload = decode(proto::AdminMessage {
            payload_variant: Some(PayloadVariant::SetOwner(proto::User {
                long_name: "Relay 7".into(),
                short_name: "R7".into(),
                ..Default::default()
            })),
            session_passkey: Vec::new(),
        });
        let Payload::Admin(report) = payload else {
            panic!("expected admin report");
        };
        assert_eq!(report.action, "set_owner");
        assert_eq!(report.detail.as_deref(), Some("Relay 7 (R7)"));
        assert!(!report.session_passkey);
    }

    #[test]
    fn test_opaque_config_body() {
        let payload = decode(proto::AdminMessage {
            payload_variant: Some(PayloadVariant::SetConfig(vec![0x0a, 0x00])),
            session_passkey: Vec::new(),
        });
        let Payload::Admin(report) = payload else {
            panic!("expected admin report");
        };
        assert_eq!(report.action, "set_config");
        assert_eq!(report.detail.as_deref(), Some("2 bytes"));
    }

    #[test]
    fn test_empty_admin() {
        let Payload::Admin(report) = decode(proto::AdminMessage::default()) else {
            panic!("expected admin report");
        };
        assert_eq!(report.action, "unknown");
        assert_eq!(report.detail, None);
    }
}

use async_trait::async_trait;
use tracing::info;

/// External messaging collaborator, addressed by reference only: the core
/// hands over a recipient and a template identifier, it never formats or
/// delivers messages itself.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, recipient: &str, template_id: &str, reference: &str);
}

pub const TEMPLATE_TRANSFER_INVITE: &str = "ticket_transfer_invite";

/// Default collaborator: records the dispatch request in the log stream.
/// Real delivery is wired in by the messaging service, not here.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn dispatch(&self, recipient: &str, template_id: &str, reference: &str) {
        info!(recipient, template_id, reference, "notification dispatch requested");
    }
}

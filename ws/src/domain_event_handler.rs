use crate::connection::GroupName;
use crate::message::{EventKind, GroupEvent};
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by converting them to group events and fanning them
/// out to the group each event kind belongs to.
pub struct WsDomainEventHandler {
    ws_manager: Arc<Manager>,
}

impl WsDomainEventHandler {
    pub fn new(ws_manager: Arc<Manager>) -> Self {
        Self { ws_manager }
    }
}

#[async_trait]
impl EventHandler for WsDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::ProductCreated {
                product_id,
                message,
            } => {
                debug!("Handling ProductCreated event for product {product_id}");

                self.ws_manager.group_send(
                    &GroupName::products(),
                    GroupEvent::new(EventKind::SendProductNotification, message.clone()),
                );
            }
        }
    }
}

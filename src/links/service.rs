//! Ticket assignment operations
//!
//! The two linking relations (ticket ↔ mechanic, ticket ↔ part) are only
//! reachable through [`AssignmentService`]. Every operation runs as one store
//! transaction, so a multi-step change either applies completely or not at
//! all.
//!
//! Removing a mechanic or part that exists but is not attached is a no-op;
//! an id that does not resolve is `NotFound`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::error::{WorkshopError, WorkshopResult};
use crate::entities::mechanic::{Mechanic, RankedMechanic};
use crate::entities::part::Part;
use crate::entities::ticket::{ServiceTicket, TicketEdit, TicketView};
use crate::storage::{InMemoryStore, Tables};

/// Service trait for the ticket linking relations
#[async_trait]
pub trait AssignmentService: Send + Sync {
    /// Create a ticket and assign its initial mechanics in one step
    async fn create_ticket(
        &self,
        ticket: ServiceTicket,
        mechanic_ids: &[Uuid],
    ) -> WorkshopResult<TicketView>;

    /// Ensure the mechanic is assigned; returns false if it already was
    async fn assign_mechanic(&self, ticket_id: &Uuid, mechanic_id: &Uuid) -> WorkshopResult<bool>;

    /// Ensure the mechanic is not assigned; returns false if it was not
    async fn remove_mechanic(&self, ticket_id: &Uuid, mechanic_id: &Uuid) -> WorkshopResult<bool>;

    /// Change description, remove then add mechanics, all or nothing
    async fn edit_ticket(&self, ticket_id: &Uuid, edit: TicketEdit) -> WorkshopResult<TicketView>;

    /// Attach parts, all or nothing; returns how many were newly attached
    async fn add_parts(&self, ticket_id: &Uuid, part_ids: &[Uuid]) -> WorkshopResult<usize>;

    /// Ensure the part is not attached; returns false if it was not
    async fn remove_part(&self, ticket_id: &Uuid, part_id: &Uuid) -> WorkshopResult<bool>;

    /// Parts attached to the ticket, in attach order
    async fn list_parts(&self, ticket_id: &Uuid) -> WorkshopResult<Vec<Part>>;

    /// Mechanics assigned to the ticket, in assignment order
    async fn list_mechanics(&self, ticket_id: &Uuid) -> WorkshopResult<Vec<Mechanic>>;

    /// The ticket with its mechanics and parts, read in one snapshot
    async fn ticket_view(&self, ticket_id: &Uuid) -> WorkshopResult<TicketView>;

    /// All mechanics ordered by number of assigned tickets, most first
    async fn top_mechanics(&self) -> WorkshopResult<Vec<RankedMechanic>>;
}

/// [`AssignmentService`] backed by an [`InMemoryStore`]
#[derive(Clone)]
pub struct InMemoryAssignmentService {
    store: InMemoryStore,
}

impl InMemoryAssignmentService {
    pub fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

fn view(tables: &Tables, ticket_id: Uuid) -> WorkshopResult<TicketView> {
    let ticket = tables.require::<ServiceTicket>(ticket_id)?.clone();
    Ok(TicketView {
        ticket,
        mechanics: mechanics_of(tables, ticket_id),
        parts: parts_of(tables, ticket_id),
    })
}

fn mechanics_of(tables: &Tables, ticket_id: Uuid) -> Vec<Mechanic> {
    tables
        .ticket_mechanics
        .rights_of(ticket_id)
        .iter()
        .filter_map(|id| tables.mechanics.get(id).cloned())
        .collect()
}

fn parts_of(tables: &Tables, ticket_id: Uuid) -> Vec<Part> {
    tables
        .ticket_parts
        .rights_of(ticket_id)
        .iter()
        .filter_map(|id| tables.parts.get(id).cloned())
        .collect()
}

fn require_all<T: crate::storage::Stored>(tables: &Tables, ids: &[Uuid]) -> WorkshopResult<()> {
    for id in ids {
        tables.require::<T>(*id)?;
    }
    Ok(())
}

#[async_trait]
impl AssignmentService for InMemoryAssignmentService {
    async fn create_ticket(
        &self,
        ticket: ServiceTicket,
        mechanic_ids: &[Uuid],
    ) -> WorkshopResult<TicketView> {
        let view = self.store.transaction(|tables| {
            let ticket = tables.insert_checked(ticket)?;
            require_all::<Mechanic>(tables, mechanic_ids)?;
            for mechanic_id in mechanic_ids {
                tables.ticket_mechanics.insert(ticket.id, *mechanic_id);
            }
            view(tables, ticket.id)
        })?;
        tracing::info!(
            ticket_id = %view.ticket.id,
            mechanics = view.mechanics.len(),
            "created"
        );
        Ok(view)
    }

    async fn assign_mechanic(&self, ticket_id: &Uuid, mechanic_id: &Uuid) -> WorkshopResult<bool> {
        let added = self.store.transaction(|tables| {
            tables.require::<ServiceTicket>(*ticket_id)?;
            tables.require::<Mechanic>(*mechanic_id)?;
            Ok(tables.ticket_mechanics.insert(*ticket_id, *mechanic_id))
        })?;
        tracing::info!(%ticket_id, %mechanic_id, added, "assigned mechanic");
        Ok(added)
    }

    async fn remove_mechanic(&self, ticket_id: &Uuid, mechanic_id: &Uuid) -> WorkshopResult<bool> {
        let removed = self.store.transaction(|tables| {
            tables.require::<ServiceTicket>(*ticket_id)?;
            tables.require::<Mechanic>(*mechanic_id)?;
            Ok(tables.ticket_mechanics.remove(*ticket_id, *mechanic_id))
        })?;
        tracing::info!(%ticket_id, %mechanic_id, removed, "removed mechanic");
        Ok(removed)
    }

    async fn edit_ticket(&self, ticket_id: &Uuid, edit: TicketEdit) -> WorkshopResult<TicketView> {
        let view = self.store.transaction(|tables| {
            tables.require::<ServiceTicket>(*ticket_id)?;
            require_all::<Mechanic>(tables, &edit.remove_ids)?;
            require_all::<Mechanic>(tables, &edit.add_ids)?;

            if let Some(ticket) = tables.tickets.get_mut(ticket_id) {
                if let Some(description) = &edit.description {
                    ticket.description = description.trim().to_string();
                }
                ticket.touch();
            }
            for mechanic_id in &edit.remove_ids {
                tables.ticket_mechanics.remove(*ticket_id, *mechanic_id);
            }
            for mechanic_id in &edit.add_ids {
                tables.ticket_mechanics.insert(*ticket_id, *mechanic_id);
            }
            view(tables, *ticket_id)
        })?;
        tracing::info!(
            %ticket_id,
            added = edit.add_ids.len(),
            removed = edit.remove_ids.len(),
            "edited ticket"
        );
        Ok(view)
    }

    async fn add_parts(&self, ticket_id: &Uuid, part_ids: &[Uuid]) -> WorkshopResult<usize> {
        if part_ids.is_empty() {
            return Err(WorkshopError::invalid_field(
                "part_ids",
                "at least one part id is required",
            ));
        }
        let added = self.store.transaction(|tables| {
            tables.require::<ServiceTicket>(*ticket_id)?;
            require_all::<Part>(tables, part_ids)?;
            Ok(part_ids
                .iter()
                .filter(|part_id| tables.ticket_parts.insert(*ticket_id, **part_id))
                .count())
        })?;
        tracing::info!(%ticket_id, added, "added parts");
        Ok(added)
    }

    async fn remove_part(&self, ticket_id: &Uuid, part_id: &Uuid) -> WorkshopResult<bool> {
        let removed = self.store.transaction(|tables| {
            tables.require::<ServiceTicket>(*ticket_id)?;
            tables.require::<Part>(*part_id)?;
            Ok(tables.ticket_parts.remove(*ticket_id, *part_id))
        })?;
        tracing::info!(%ticket_id, %part_id, removed, "removed part");
        Ok(removed)
    }

    async fn list_parts(&self, ticket_id: &Uuid) -> WorkshopResult<Vec<Part>> {
        self.store.read(|tables| {
            tables.require::<ServiceTicket>(*ticket_id)?;
            Ok(parts_of(tables, *ticket_id))
        })
    }

    async fn list_mechanics(&self, ticket_id: &Uuid) -> WorkshopResult<Vec<Mechanic>> {
        self.store.read(|tables| {
            tables.require::<ServiceTicket>(*ticket_id)?;
            Ok(mechanics_of(tables, *ticket_id))
        })
    }

    async fn ticket_view(&self, ticket_id: &Uuid) -> WorkshopResult<TicketView> {
        self.store.read(|tables| view(tables, *ticket_id))
    }

    async fn top_mechanics(&self) -> WorkshopResult<Vec<RankedMechanic>> {
        self.store.read(|tables| {
            let counts = tables.ticket_mechanics.count_by_right();
            let mut ranked: Vec<RankedMechanic> = tables
                .mechanics
                .values()
                .map(|mechanic| RankedMechanic {
                    ticket_count: counts.get(&mechanic.id()).copied().unwrap_or(0),
                    mechanic: mechanic.clone(),
                })
                .collect();
            ranked.sort_by(|a, b| b.ticket_count.cmp(&a.ticket_count));
            Ok(ranked)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::DataService;
    use crate::entities::customer::{CreateCustomer, Customer};
    use crate::entities::mechanic::CreateMechanic;
    use crate::entities::part::CreatePart;
    use crate::storage::InMemoryDataService;

    struct Fixture {
        store: InMemoryStore,
        assignments: InMemoryAssignmentService,
        ticket: ServiceTicket,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let customer = InMemoryDataService::<Customer>::new(store.clone())
            .create(Customer::new(
                CreateCustomer {
                    name: "Ada".into(),
                    email: "a@b.com".into(),
                    phone: "555".into(),
                    address: "1 Main St".into(),
                    password: "pw1".into(),
                },
                "hash".into(),
            ))
            .await
            .unwrap();
        let ticket = InMemoryDataService::<ServiceTicket>::new(store.clone())
            .create(ServiceTicket::new("Brake squeal", customer.id, None))
            .await
            .unwrap();
        Fixture {
            assignments: InMemoryAssignmentService::new(store.clone()),
            store,
            ticket,
        }
    }

    async fn mechanic(store: &InMemoryStore, email: &str) -> Mechanic {
        InMemoryDataService::<Mechanic>::new(store.clone())
            .create(Mechanic::new(
                CreateMechanic {
                    name: email.into(),
                    email: email.into(),
                    phone: "555".into(),
                    address: "2 Garage Rd".into(),
                    specialty: "Brakes".into(),
                    salary: 1.0,
                    password: "pw".into(),
                },
                "hash".into(),
            ))
            .await
            .unwrap()
    }

    async fn part(store: &InMemoryStore, sku: &str) -> Part {
        InMemoryDataService::<Part>::new(store.clone())
            .create(Part::new(CreatePart {
                name: "Pad".into(),
                sku: sku.into(),
                description: None,
                price: 12.0,
            }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let f = fixture().await;
        let m1 = mechanic(&f.store, "m1@shop.com").await;

        assert!(f.assignments.assign_mechanic(&f.ticket.id, &m1.id).await.unwrap());
        assert!(!f.assignments.assign_mechanic(&f.ticket.id, &m1.id).await.unwrap());

        let mechanics = f.assignments.list_mechanics(&f.ticket.id).await.unwrap();
        assert_eq!(mechanics.len(), 1);
        assert_eq!(mechanics[0].id, m1.id);
    }

    #[tokio::test]
    async fn test_assign_unknown_ids() {
        let f = fixture().await;
        let m1 = mechanic(&f.store, "m1@shop.com").await;

        let err = f
            .assignments
            .assign_mechanic(&Uuid::new_v4(), &m1.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
        let err = f
            .assignments
            .assign_mechanic(&f.ticket.id, &Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_remove_unassigned_is_noop() {
        let f = fixture().await;
        let m1 = mechanic(&f.store, "m1@shop.com").await;
        assert!(!f.assignments.remove_mechanic(&f.ticket.id, &m1.id).await.unwrap());

        f.assignments.assign_mechanic(&f.ticket.id, &m1.id).await.unwrap();
        assert!(f.assignments.remove_mechanic(&f.ticket.id, &m1.id).await.unwrap());
        assert!(f.assignments.list_mechanics(&f.ticket.id).await.unwrap().is_empty());

        let err = f
            .assignments
            .remove_mechanic(&Uuid::new_v4(), &m1.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_add_parts_is_all_or_nothing() {
        let f = fixture().await;
        let p1 = part(&f.store, "P-1").await;

        let err = f
            .assignments
            .add_parts(&f.ticket.id, &[p1.id, Uuid::new_v4()])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
        assert!(f.assignments.list_parts(&f.ticket.id).await.unwrap().is_empty());

        let added = f
            .assignments
            .add_parts(&f.ticket.id, &[p1.id, p1.id])
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(f.assignments.list_parts(&f.ticket.id).await.unwrap().len(), 1);

        let err = f.assignments.add_parts(&f.ticket.id, &[]).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_edit_ticket_is_atomic() {
        let f = fixture().await;
        let m1 = mechanic(&f.store, "m1@shop.com").await;
        let m2 = mechanic(&f.store, "m2@shop.com").await;
        f.assignments.assign_mechanic(&f.ticket.id, &m1.id).await.unwrap();

        let err = f
            .assignments
            .edit_ticket(
                &f.ticket.id,
                TicketEdit {
                    description: Some("Changed".into()),
                    add_ids: vec![m2.id, Uuid::new_v4()],
                    remove_ids: vec![m1.id],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");

        let unchanged = f.assignments.ticket_view(&f.ticket.id).await.unwrap();
        assert_eq!(unchanged.ticket.description, "Brake squeal");
        assert_eq!(unchanged.mechanics.len(), 1);
        assert_eq!(unchanged.mechanics[0].id, m1.id);

        let edited = f
            .assignments
            .edit_ticket(
                &f.ticket.id,
                TicketEdit {
                    description: Some("Changed".into()),
                    add_ids: vec![m2.id],
                    remove_ids: vec![m1.id],
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.ticket.description, "Changed");
        let ids: Vec<_> = edited.mechanics.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![m2.id]);
    }

    #[tokio::test]
    async fn test_edit_remove_then_add_keeps_mechanic() {
        let f = fixture().await;
        let m1 = mechanic(&f.store, "m1@shop.com").await;
        f.assignments.assign_mechanic(&f.ticket.id, &m1.id).await.unwrap();

        let edited = f
            .assignments
            .edit_ticket(
                &f.ticket.id,
                TicketEdit {
                    description: None,
                    add_ids: vec![m1.id],
                    remove_ids: vec![m1.id],
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.mechanics.len(), 1);
    }

    #[tokio::test]
    async fn test_create_ticket_with_unknown_mechanic_rolls_back() {
        let f = fixture().await;
        let before = f.store.read(|t| Ok(t.tickets.len())).unwrap();

        let err = f
            .assignments
            .create_ticket(
                ServiceTicket::new("Noise", f.ticket.customer_id, None),
                &[Uuid::new_v4()],
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
        assert_eq!(f.store.read(|t| Ok(t.tickets.len())).unwrap(), before);
    }

    #[tokio::test]
    async fn test_deletes_detach_links() {
        let f = fixture().await;
        let m1 = mechanic(&f.store, "m1@shop.com").await;
        let p1 = part(&f.store, "P-1").await;
        f.assignments.assign_mechanic(&f.ticket.id, &m1.id).await.unwrap();
        f.assignments.add_parts(&f.ticket.id, &[p1.id]).await.unwrap();

        InMemoryDataService::<Mechanic>::new(f.store.clone())
            .delete(&m1.id)
            .await
            .unwrap();
        InMemoryDataService::<Part>::new(f.store.clone())
            .delete(&p1.id)
            .await
            .unwrap();

        let view = f.assignments.ticket_view(&f.ticket.id).await.unwrap();
        assert!(view.mechanics.is_empty());
        assert!(view.parts.is_empty());
        let links = f
            .store
            .read(|t| Ok(t.ticket_mechanics.len() + t.ticket_parts.len()))
            .unwrap();
        assert_eq!(links, 0);
    }

    #[tokio::test]
    async fn test_top_mechanics_order() {
        let f = fixture().await;
        let m1 = mechanic(&f.store, "m1@shop.com").await;
        let m2 = mechanic(&f.store, "m2@shop.com").await;
        let second = InMemoryDataService::<ServiceTicket>::new(f.store.clone())
            .create(ServiceTicket::new("Oil", f.ticket.customer_id, None))
            .await
            .unwrap();
        f.assignments.assign_mechanic(&f.ticket.id, &m2.id).await.unwrap();
        f.assignments.assign_mechanic(&second.id, &m2.id).await.unwrap();
        f.assignments.assign_mechanic(&second.id, &m1.id).await.unwrap();

        let top = f.assignments.top_mechanics().await.unwrap();
        assert_eq!(top[0].mechanic.id, m2.id);
        assert_eq!(top[0].ticket_count, 2);
        assert_eq!(top[1].ticket_count, 1);
    }
}

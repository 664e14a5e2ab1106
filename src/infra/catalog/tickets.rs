use async_trait::async_trait;

use crate::application::repos::{RepoError, TicketsRepo};
use crate::domain::entities::{CustomFieldOption, SystemFieldOption, TicketField, TicketForm};
use crate::domain::types::Locale;
use crate::util::locks::read;

use super::{MemoryCatalog, SOURCE};

#[async_trait]
impl TicketsRepo for MemoryCatalog {
    async fn find_ticket_form(&self, form_id: i64) -> Result<TicketForm, RepoError> {
        read(&self.tickets, SOURCE, "find_ticket_form")
            .forms
            .get(&form_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    /// Fields in the order the form lists them. Ticket data is not translated, so `locale` is unused.
    async fn ticket_fields_by_form(
        &self,
        form_id: i64,
        _locale: Locale,
    ) -> Result<Vec<TicketField>, RepoError> {
        let tickets = read(&self.tickets, SOURCE, "ticket_fields_by_form");
        let form = tickets.forms.get(&form_id).ok_or(RepoError::NotFound)?;
        form.ticket_field_ids
            .iter()
            .map(|field_id| {
                tickets.fields.get(field_id).cloned().ok_or_else(|| {
                    RepoError::integrity(format!(
                        "form {form_id} references missing field {field_id}"
                    ))
                })
            })
            .collect()
    }

    async fn custom_field_options(
        &self,
        field_id: i64,
    ) -> Result<Vec<CustomFieldOption>, RepoError> {
        read(&self.tickets, SOURCE, "custom_field_options")
            .fields
            .get(&field_id)
            .map(|field| field.custom_field_options.clone())
            .ok_or(RepoError::NotFound)
    }

    async fn system_field_options(
        &self,
        field_id: i64,
    ) -> Result<Vec<SystemFieldOption>, RepoError> {
        read(&self.tickets, SOURCE, "system_field_options")
            .fields
            .get(&field_id)
            .map(|field| field.system_field_options.clone())
            .ok_or(RepoError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::repos::CatalogSync;

    fn form(id: i64, field_ids: Vec<i64>) -> TicketForm {
        TicketForm {
            id,
            name: format!("form {id}"),
            raw_name: String::new(),
            display_name: String::new(),
            raw_display_name: String::new(),
            position: 1,
            active: true,
            end_user_visible: true,
            ticket_field_ids: field_ids,
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    fn field(id: i64) -> TicketField {
        TicketField {
            id,
            field_type: "tagger".to_string(),
            title: format!("field {id}"),
            raw_title: String::new(),
            description: String::new(),
            raw_description: String::new(),
            position: 1,
            active: true,
            required: false,
            collapsed_for_agents: false,
            regexp_for_validation: None,
            title_in_portal: String::new(),
            raw_title_in_portal: String::new(),
            visible_in_portal: true,
            editable_in_portal: true,
            required_in_portal: false,
            tag: None,
            removable: true,
            custom_field_options: vec![CustomFieldOption {
                id: id * 10,
                name: "option".to_string(),
                raw_name: String::new(),
                value: "option".to_string(),
            }],
            system_field_options: Vec::new(),
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    #[tokio::test]
    async fn fields_follow_form_order() {
        let catalog = MemoryCatalog::new();
        catalog
            .replace_ticket_forms(vec![form(1, vec![3, 2])], vec![field(2), field(3)])
            .await
            .expect("seed");

        let fields = catalog
            .ticket_fields_by_form(1, Locale::EnUs)
            .await
            .expect("fields");
        let ids: Vec<_> = fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 2]);

        let options = catalog.custom_field_options(2).await.expect("options");
        assert_eq!(options[0].id, 20);
        assert!(catalog.system_field_options(2).await.expect("system").is_empty());
        assert_eq!(catalog.find_ticket_form(9).await, Err(RepoError::NotFound));
    }

    #[tokio::test]
    async fn dangling_field_reference_is_an_integrity_error() {
        let catalog = MemoryCatalog::new();
        catalog
            .replace_ticket_forms(vec![form(1, vec![4])], Vec::new())
            .await
            .expect("seed");

        assert!(matches!(
            catalog.ticket_fields_by_form(1, Locale::EnUs).await,
            Err(RepoError::Integrity { .. })
        ));
    }
}

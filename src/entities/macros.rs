//! Macros for reducing boilerplate when defining entities

/// Implement [`Entity`](crate::core::entity::Entity) for a struct
///
/// The struct must have `id: Uuid`, `created_at` and `updated_at` fields.
/// Every listed field becomes reachable through `field_value` (for filters,
/// sorting and uniqueness checks); `id`, `created_at` and `updated_at` always
/// are.
///
/// # Example
///
/// ```rust,ignore
/// impl_entity!(
///     Part,
///     "inventory",
///     "part",
///     unique: ["sku"],
///     fields: [name, sku, description, price]
/// );
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident,
        $plural:expr,
        $singular:expr,
        unique: [$($unique:expr),* $(,)?],
        fields: [$($field:ident),* $(,)?]
    ) => {
        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn unique_fields() -> &'static [&'static str] {
                &[$($unique),*]
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
            }

            fn field_value(&self, field: &str) -> Option<String> {
                use $crate::core::entity::FieldText;
                match field {
                    "id" => return self.id.field_text(),
                    "created_at" => return self.created_at.field_text(),
                    "updated_at" => return self.updated_at.field_text(),
                    _ => {}
                }
                $(
                    if field == stringify!($field) {
                        return self.$field.field_text();
                    }
                )*
                None
            }

            fn is_numeric_field(&self, field: &str) -> bool {
                use $crate::core::entity::FieldText;
                $(
                    if field == stringify!($field) {
                        return self.$field.is_numeric();
                    }
                )*
                false
            }
        }
    };
}

/// Implement [`Account`](crate::core::entity::Account) for a struct with a
/// `password_hash` field; login looks the account up by its `email` field
#[macro_export]
macro_rules! impl_account {
    ($type:ident, $role:expr) => {
        impl $crate::core::entity::Account for $type {
            const ROLE: $crate::core::auth::Role = $role;

            fn password_hash(&self) -> &str {
                &self.password_hash
            }
        }
    };
}

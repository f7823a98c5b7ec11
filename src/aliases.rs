//! Header alias table used by the column mapper.
//!
//! The table is plain data: adding an accounting system or a new header
//! spelling never touches the scoring code in [`crate::mapper`].

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{data::normalize_header, model::CanonicalField};

/// Accounting system an export is known to come from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum SourceSystem {
    #[default]
    Generic,
    Sage,
    Quickbooks,
    Pennylane,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    #[serde(default)]
    pub fields: BTreeMap<CanonicalField, Vec<String>>,
    /// Extra aliases only consulted when the matching source system is hinted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub systems: BTreeMap<SourceSystem, BTreeMap<CanonicalField, Vec<String>>>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl AliasTable {
    pub fn builtin() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            CanonicalField::Date,
            owned(&[
                "date",
                "date operation",
                "date transaction",
                "transaction date",
                "date comptable",
                "date ecriture",
                "date valeur",
                "value date",
                "posting date",
                "booking date",
                "jour",
            ]),
        );
        fields.insert(
            CanonicalField::Description,
            owned(&[
                "description",
                "libelle",
                "libelle ecriture",
                "libelle operation",
                "label",
                "memo",
                "designation",
                "intitule",
                "details",
                "narrative",
                "objet",
            ]),
        );
        fields.insert(
            CanonicalField::Amount,
            owned(&[
                "montant",
                "amount",
                "valeur",
                "total",
                "montant ttc",
                "montant ht",
                "somme",
                "value",
                "net amount",
                "prix",
            ]),
        );
        fields.insert(
            CanonicalField::Type,
            owned(&[
                "type",
                "sens",
                "nature",
                "type operation",
                "transaction type",
                "flux",
                "direction",
            ]),
        );
        fields.insert(
            CanonicalField::Category,
            owned(&["categorie", "category", "rubrique", "poste", "famille"]),
        );
        fields.insert(
            CanonicalField::Subcategory,
            owned(&["sous categorie", "subcategory", "sub category", "sous rubrique"]),
        );
        fields.insert(
            CanonicalField::Account,
            owned(&[
                "compte",
                "account",
                "numero compte",
                "compte general",
                "account number",
                "gl account",
                "code compte",
            ]),
        );
        fields.insert(
            CanonicalField::Reference,
            owned(&[
                "reference",
                "ref",
                "numero",
                "piece",
                "numero piece",
                "invoice number",
                "facture",
                "transaction id",
            ]),
        );
        fields.insert(
            CanonicalField::Counterparty,
            owned(&[
                "client",
                "fournisseur",
                "tiers",
                "counterparty",
                "payee",
                "beneficiaire",
                "customer",
                "vendor",
                "supplier",
                "nom client",
                "raison sociale",
                "merchant",
            ]),
        );
        fields.insert(
            CanonicalField::PaymentStatus,
            owned(&[
                "statut",
                "status",
                "etat",
                "payment status",
                "statut paiement",
                "reglement",
            ]),
        );
        fields.insert(
            CanonicalField::DueDate,
            owned(&[
                "echeance",
                "date echeance",
                "due date",
                "date limite",
                "date reglement",
            ]),
        );

        let mut systems = BTreeMap::new();
        systems.insert(
            SourceSystem::Sage,
            BTreeMap::from([
                (CanonicalField::Date, owned(&["date piece", "date saisie"])),
                (CanonicalField::Reference, owned(&["n piece", "numero facture"])),
                (
                    CanonicalField::Counterparty,
                    owned(&["intitule tiers", "compte tiers"]),
                ),
                (
                    CanonicalField::Account,
                    owned(&["n compte general", "compte general"]),
                ),
                (
                    CanonicalField::Amount,
                    owned(&["montant tenue compte", "montant devise"]),
                ),
            ]),
        );
        systems.insert(
            SourceSystem::Quickbooks,
            BTreeMap::from([
                (CanonicalField::Date, owned(&["txn date"])),
                (CanonicalField::Counterparty, owned(&["name"])),
                (CanonicalField::Reference, owned(&["num", "no"])),
                (CanonicalField::Category, owned(&["class"])),
                (CanonicalField::Account, owned(&["split"])),
            ]),
        );
        systems.insert(
            SourceSystem::Pennylane,
            BTreeMap::from([
                (CanonicalField::Counterparty, owned(&["thirdparty", "third party"])),
                (CanonicalField::Category, owned(&["categories"])),
            ]),
        );

        Self { fields, systems }
    }

    /// Appends every alias of `other` that is not already present.
    pub fn merge(&mut self, other: &AliasTable) {
        fn extend(target: &mut Vec<String>, extra: &[String]) {
            for alias in extra {
                if !target.contains(alias) {
                    target.push(alias.clone());
                }
            }
        }
        for (field, aliases) in &other.fields {
            extend(self.fields.entry(*field).or_default(), aliases);
        }
        for (system, fields) in &other.systems {
            let target = self.systems.entry(*system).or_default();
            for (field, aliases) in fields {
                extend(target.entry(*field).or_default(), aliases);
            }
        }
    }

    /// Normalized aliases for one field, system-specific ones first.
    pub fn aliases_for(&self, field: CanonicalField, system: SourceSystem) -> Vec<String> {
        let hinted = self
            .systems
            .get(&system)
            .and_then(|fields| fields.get(&field))
            .into_iter()
            .flatten();
        let general = self.fields.get(&field).into_iter().flatten();
        let mut aliases: Vec<String> = Vec::new();
        for alias in hinted.chain(general) {
            let normalized = normalize_header(alias);
            if !normalized.is_empty() && !aliases.contains(&normalized) {
                aliases.push(normalized);
            }
        }
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_every_canonical_field() {
        let table = AliasTable::builtin();
        for field in CanonicalField::ALL {
            assert!(
                !table.aliases_for(field, SourceSystem::Generic).is_empty(),
                "no aliases for {field}"
            );
        }
    }

    #[test]
    fn hinted_system_aliases_come_first() {
        let table = AliasTable::builtin();
        let sage = table.aliases_for(CanonicalField::Date, SourceSystem::Sage);
        assert_eq!(sage[0], "date piece");
        let generic = table.aliases_for(CanonicalField::Date, SourceSystem::Generic);
        assert!(!generic.contains(&"date piece".to_string()));
    }

    #[test]
    fn merge_appends_without_duplicates() {
        let mut table = AliasTable::builtin();
        let extra = AliasTable {
            fields: BTreeMap::from([(
                CanonicalField::Amount,
                vec!["montant".to_string(), "betrag".to_string()],
            )]),
            systems: BTreeMap::new(),
        };
        let before = table.fields[&CanonicalField::Amount].len();
        table.merge(&extra);
        assert_eq!(table.fields[&CanonicalField::Amount].len(), before + 1);
        assert!(
            table
                .aliases_for(CanonicalField::Amount, SourceSystem::Generic)
                .contains(&"betrag".to_string())
        );
    }
}

//! Families (keluarga): residents grouped by No. KK.

use std::collections::BTreeMap;

use sid_api::Backend;
use sid_core::error::SidResult;
use sid_models::{queries, Database, Penduduk};

use crate::resident::{ResidentFilter, ResidentService};
use crate::service::{impl_service, ServiceState};

/// One family card.
#[derive(Debug, Clone, PartialEq)]
pub struct Keluarga {
    pub no_kk: String,
    /// Members with the head of family first, then by birth date.
    pub anggota: Vec<Penduduk>,
}

impl Keluarga {
    pub fn kepala(&self) -> Option<&Penduduk> {
        self.anggota.iter().find(|p| p.is_kepala_keluarga())
    }

    /// Head's name, or the first member's when no head is recorded.
    pub fn nama_kepala(&self) -> &str {
        self.kepala()
            .or_else(|| self.anggota.first())
            .map(|p| p.nama.as_str())
            .unwrap_or("")
    }

    pub fn dusun(&self) -> Option<&str> {
        self.kepala()
            .or_else(|| self.anggota.first())
            .and_then(|p| p.dusun.as_deref())
    }
}

fn member_order(a: &Penduduk, b: &Penduduk) -> std::cmp::Ordering {
    b.is_kepala_keluarga()
        .cmp(&a.is_kepala_keluarga())
        .then_with(|| a.tanggal_lahir.cmp(&b.tanggal_lahir))
}

/// Group residents by No. KK, ordered by the head's name. Residents with
/// an empty No. KK are left out.
pub fn group_families(residents: &[Penduduk]) -> Vec<Keluarga> {
    let mut by_kk: BTreeMap<&str, Vec<Penduduk>> = BTreeMap::new();
    for p in residents.iter().filter(|p| !p.no_kk.trim().is_empty()) {
        by_kk.entry(p.no_kk.trim()).or_default().push(p.clone());
    }

    let mut families: Vec<Keluarga> = by_kk
        .into_iter()
        .map(|(no_kk, mut anggota)| {
            anggota.sort_by(member_order);
            Keluarga { no_kk: no_kk.to_string(), anggota }
        })
        .collect();
    families.sort_by(|a, b| {
        a.nama_kepala()
            .to_lowercase()
            .cmp(&b.nama_kepala().to_lowercase())
            .then_with(|| a.no_kk.cmp(&b.no_kk))
    });
    families
}

pub struct FamilyService {
    state: ServiceState,
    database: Database,
}

impl_service!(FamilyService, "family");

impl FamilyService {
    pub fn new(database: Database) -> Self {
        Self {
            state: ServiceState::Created,
            database,
        }
    }

    /// Families visible to the current session, built from the remote roster.
    pub async fn list(
        &self,
        backend: &dyn Backend,
        residents: &ResidentService,
        dusun: Option<String>,
    ) -> SidResult<Vec<Keluarga>> {
        let filter = ResidentFilter { dusun, ..Default::default() };
        let roster = residents.list(backend, &filter).await?;
        Ok(group_families(&roster))
    }

    /// Members of one family from the local cache.
    pub fn members_cached(&self, no_kk: &str) -> SidResult<Keluarga> {
        let conn = self.database.conn()?;
        let anggota = queries::list_by_no_kk(&conn, no_kk)?;
        Ok(Keluarga { no_kk: no_kk.to_string(), anggota })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(nik: &str, kk: &str, nama: &str, hub: &str, lahir: &str) -> Penduduk {
        Penduduk {
            nik: nik.into(),
            no_kk: kk.into(),
            nama: nama.into(),
            hubungan_keluarga: Some(hub.into()),
            tanggal_lahir: Some(lahir.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_group_families() {
        let residents = vec![
            p("1", "KK2", "Ani", "Anak", "2010-01-01"),
            p("2", "KK1", "Sari", "Istri", "1982-03-03"),
            p("3", "KK1", "Warsito", "Kepala Keluarga", "1980-01-01"),
            p("4", "KK2", "Agus", "Kepala Keluarga", "1975-05-05"),
            p("5", "KK1", "Dewi", "Anak", "2005-02-02"),
            p("6", "", "Tanpa KK", "Anak", "2000-01-01"),
        ];
        let families = group_families(&residents);
        assert_eq!(families.len(), 2);

        assert_eq!(families[0].no_kk, "KK2");
        assert_eq!(families[0].nama_kepala(), "Agus");

        let kk1: Vec<&str> = families[1].anggota.iter().map(|p| p.nama.as_str()).collect();
        assert_eq!(kk1, vec!["Warsito", "Sari", "Dewi"]);
    }

    #[test]
    fn test_family_without_head() {
        let fam = group_families(&[p("1", "KK9", "Rina", "Anak", "2001-01-01")]);
        assert!(fam[0].kepala().is_none());
        assert_eq!(fam[0].nama_kepala(), "Rina");
    }
}

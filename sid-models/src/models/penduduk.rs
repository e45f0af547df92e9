//! Resident (penduduk) entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use sid_core::error::{SidError, SidResult};

/// A resident record as stored in the backend `penduduk` table.
///
/// Every column other than NIK, No. KK and nama is optional because the
/// backend accepts partially filled records from imports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Penduduk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nik: String,
    pub no_kk: String,
    pub nama: String,
    #[serde(default)]
    pub tempat_lahir: Option<String>,
    /// ISO date (`YYYY-MM-DD`).
    #[serde(default)]
    pub tanggal_lahir: Option<String>,
    /// `L` or `P`.
    #[serde(default)]
    pub jenis_kelamin: Option<String>,
    #[serde(default)]
    pub agama: Option<String>,
    #[serde(default)]
    pub pekerjaan: Option<String>,
    #[serde(default)]
    pub status_perkawinan: Option<String>,
    #[serde(default)]
    pub pendidikan: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
    #[serde(default)]
    pub rt: Option<String>,
    #[serde(default)]
    pub rw: Option<String>,
    #[serde(default)]
    pub dusun: Option<String>,
    /// Position within the family card, e.g. "Kepala Keluarga", "Istri", "Anak".
    #[serde(default)]
    pub hubungan_keluarga: Option<String>,
    #[serde(default)]
    pub kewarganegaraan: Option<String>,
}

/// Column names addressable through [`Penduduk::attribute`].
pub const ATTRIBUTES: &[&str] = &[
    "nik",
    "no_kk",
    "nama",
    "tempat_lahir",
    "tanggal_lahir",
    "jenis_kelamin",
    "agama",
    "pekerjaan",
    "status_perkawinan",
    "pendidikan",
    "alamat",
    "rt",
    "rw",
    "dusun",
    "hubungan_keluarga",
    "kewarganegaraan",
];

impl Penduduk {
    /// Create a Penduduk from a backend JSON row.
    pub fn from_server_map(map: &serde_json::Value) -> SidResult<Self> {
        serde_json::from_value(map.clone())
            .map_err(|e| SidError::Serialization(format!("invalid penduduk row: {e}")))
    }

    /// Construct a Penduduk from a cache row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("remote_id")?,
            nik: row.get("nik")?,
            no_kk: row.get("no_kk")?,
            nama: row.get("nama")?,
            tempat_lahir: row.get("tempat_lahir")?,
            tanggal_lahir: row.get("tanggal_lahir")?,
            jenis_kelamin: row.get("jenis_kelamin")?,
            agama: row.get("agama")?,
            pekerjaan: row.get("pekerjaan")?,
            status_perkawinan: row.get("status_perkawinan")?,
            pendidikan: row.get("pendidikan")?,
            alamat: row.get("alamat")?,
            rt: row.get("rt")?,
            rw: row.get("rw")?,
            dusun: row.get("dusun")?,
            hubungan_keluarga: row.get("hubungan_keluarga")?,
            kewarganegaraan: row.get("kewarganegaraan")?,
        })
    }

    /// Read a column by name. Empty strings count as missing.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "id" => self.id.clone(),
            "nik" => Some(self.nik.clone()),
            "no_kk" => Some(self.no_kk.clone()),
            "nama" => Some(self.nama.clone()),
            "tempat_lahir" => self.tempat_lahir.clone(),
            "tanggal_lahir" => self.tanggal_lahir.clone(),
            "jenis_kelamin" => self.jenis_kelamin.clone(),
            "agama" => self.agama.clone(),
            "pekerjaan" => self.pekerjaan.clone(),
            "status_perkawinan" => self.status_perkawinan.clone(),
            "pendidikan" => self.pendidikan.clone(),
            "alamat" => self.alamat.clone(),
            "rt" => self.rt.clone(),
            "rw" => self.rw.clone(),
            "dusun" => self.dusun.clone(),
            "hubungan_keluarga" => self.hubungan_keluarga.clone(),
            "kewarganegaraan" => self.kewarganegaraan.clone(),
            "tempat_tanggal_lahir" => self.tempat_tanggal_lahir(),
            _ => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// "Tempat, YYYY-MM-DD" when both parts are known.
    pub fn tempat_tanggal_lahir(&self) -> Option<String> {
        match (&self.tempat_lahir, &self.tanggal_lahir) {
            (Some(t), Some(d)) if !t.is_empty() && !d.is_empty() => Some(format!("{t}, {d}")),
            (Some(t), _) if !t.is_empty() => Some(t.clone()),
            (_, Some(d)) if !d.is_empty() => Some(d.clone()),
            _ => None,
        }
    }

    /// Street address with RT/RW and dusun, e.g. "Jl. Melati 4 RT 001/RW 002, Dusun Krajan".
    pub fn alamat_lengkap(&self) -> String {
        let mut parts = Vec::new();
        if let Some(alamat) = self.alamat.as_deref().filter(|a| !a.is_empty()) {
            parts.push(alamat.to_string());
        }
        match (self.rt.as_deref(), self.rw.as_deref()) {
            (Some(rt), Some(rw)) if !rt.is_empty() && !rw.is_empty() => {
                parts.push(format!("RT {rt}/RW {rw}"));
            }
            (Some(rt), _) if !rt.is_empty() => parts.push(format!("RT {rt}")),
            (_, Some(rw)) if !rw.is_empty() => parts.push(format!("RW {rw}")),
            _ => {}
        }
        let street = parts.join(" ");
        match self.dusun.as_deref().filter(|d| !d.is_empty()) {
            Some(dusun) if street.is_empty() => format!("Dusun {dusun}"),
            Some(dusun) => format!("{street}, Dusun {dusun}"),
            None => street,
        }
    }

    /// Whether this resident heads the family card.
    pub fn is_kepala_keluarga(&self) -> bool {
        self.hubungan_keluarga
            .as_deref()
            .map_or(false, |h| h.eq_ignore_ascii_case("kepala keluarga"))
    }

    /// Case-insensitive substring match on nama or NIK.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.nama.to_lowercase().contains(&q) || self.nik.contains(&q)
    }

    // ─── Persistence (local cache) ───────────────────────────────────────

    /// Upsert this resident into the local cache, keyed by NIK.
    pub fn save(&self, conn: &Connection) -> SidResult<()> {
        conn.execute(
            "INSERT INTO penduduk_cache (
                remote_id, nik, no_kk, nama, tempat_lahir, tanggal_lahir, jenis_kelamin,
                agama, pekerjaan, status_perkawinan, pendidikan, alamat, rt, rw, dusun,
                hubungan_keluarga, kewarganegaraan
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)
            ON CONFLICT(nik) DO UPDATE SET
                remote_id = excluded.remote_id,
                no_kk = excluded.no_kk,
                nama = excluded.nama,
                tempat_lahir = excluded.tempat_lahir,
                tanggal_lahir = excluded.tanggal_lahir,
                jenis_kelamin = excluded.jenis_kelamin,
                agama = excluded.agama,
                pekerjaan = excluded.pekerjaan,
                status_perkawinan = excluded.status_perkawinan,
                pendidikan = excluded.pendidikan,
                alamat = excluded.alamat,
                rt = excluded.rt,
                rw = excluded.rw,
                dusun = excluded.dusun,
                hubungan_keluarga = excluded.hubungan_keluarga,
                kewarganegaraan = excluded.kewarganegaraan",
            params![
                self.id,
                self.nik,
                self.no_kk,
                self.nama,
                self.tempat_lahir,
                self.tanggal_lahir,
                self.jenis_kelamin,
                self.agama,
                self.pekerjaan,
                self.status_perkawinan,
                self.pendidikan,
                self.alamat,
                self.rt,
                self.rw,
                self.dusun,
                self.hubungan_keluarga,
                self.kewarganegaraan,
            ],
        )
        .map_err(|e| SidError::Database(e.to_string()))?;
        Ok(())
    }

    /// Find a cached resident by NIK.
    pub fn find_by_nik(conn: &Connection, nik: &str) -> SidResult<Option<Self>> {
        match conn.query_row(
            "SELECT * FROM penduduk_cache WHERE nik = ?1",
            [nik],
            Self::from_row,
        ) {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SidError::Database(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Penduduk {
        Penduduk {
            id: Some("uuid-1".into()),
            nik: "3201010101900001".into(),
            no_kk: "3201010101900100".into(),
            nama: "Siti Aminah".into(),
            tempat_lahir: Some("Bogor".into()),
            tanggal_lahir: Some("1990-01-01".into()),
            alamat: Some("Jl. Melati 4".into()),
            rt: Some("001".into()),
            rw: Some("002".into()),
            dusun: Some("Krajan".into()),
            hubungan_keluarga: Some("Kepala Keluarga".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_server_map() {
        let json = serde_json::json!({
            "id": "abc",
            "nik": "3201010101900001",
            "no_kk": "3201010101900100",
            "nama": "Budi",
            "dusun": "Krajan",
            "created_at": "2024-01-01T00:00:00Z"
        });
        let p = Penduduk::from_server_map(&json).unwrap();
        assert_eq!(p.nama, "Budi");
        assert_eq!(p.dusun.as_deref(), Some("Krajan"));
        assert!(p.agama.is_none());
    }

    #[test]
    fn test_attribute_lookup() {
        let p = sample();
        assert_eq!(p.attribute("nama").as_deref(), Some("Siti Aminah"));
        assert_eq!(p.attribute("tempat_tanggal_lahir").as_deref(), Some("Bogor, 1990-01-01"));
        assert!(p.attribute("agama").is_none());
        assert!(p.attribute("unknown").is_none());
    }

    #[test]
    fn test_alamat_lengkap() {
        assert_eq!(sample().alamat_lengkap(), "Jl. Melati 4 RT 001/RW 002, Dusun Krajan");
        let bare = Penduduk { dusun: Some("Sukamaju".into()), ..Default::default() };
        assert_eq!(bare.alamat_lengkap(), "Dusun Sukamaju");
    }

    #[test]
    fn test_matches_query() {
        let p = sample();
        assert!(p.matches_query("aminah"));
        assert!(p.matches_query("32010101"));
        assert!(!p.matches_query("budi"));
        assert!(p.is_kepala_keluarga());
    }

    #[test]
    fn test_cache_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::create_tables(&conn).unwrap();
        let p = sample();
        p.save(&conn).unwrap();
        p.save(&conn).unwrap();
        let found = Penduduk::find_by_nik(&conn, &p.nik).unwrap().unwrap();
        assert_eq!(found, p);
        assert!(Penduduk::find_by_nik(&conn, "0").unwrap().is_none());
    }
}

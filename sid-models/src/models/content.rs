//! Public site content: news, gallery, announcements, agenda.

use serde::{Deserialize, Serialize};

/// A news article (`berita`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Berita {
    pub id: String,
    pub judul: String,
    pub slug: String,
    #[serde(default)]
    pub ringkasan: Option<String>,
    #[serde(default)]
    pub konten: String,
    #[serde(default)]
    pub gambar_url: Option<String>,
    #[serde(default)]
    pub penulis: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// A gallery photo (`galeri`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Galeri {
    pub id: String,
    pub judul: String,
    #[serde(default)]
    pub deskripsi: Option<String>,
    pub gambar_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An announcement (`pengumuman`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pengumuman {
    pub id: String,
    pub judul: String,
    #[serde(default)]
    pub isi: String,
    #[serde(default)]
    pub tanggal_mulai: Option<String>,
    #[serde(default)]
    pub tanggal_selesai: Option<String>,
    #[serde(default)]
    pub penting: bool,
}

impl Pengumuman {
    /// Whether the announcement is visible on `today` (ISO date).
    pub fn is_active_on(&self, today: &str) -> bool {
        let started = self.tanggal_mulai.as_deref().map_or(true, |d| d <= today);
        let not_ended = self.tanggal_selesai.as_deref().map_or(true, |d| d >= today);
        started && not_ended
    }
}

/// A village agenda item (`agenda`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agenda {
    pub id: String,
    pub judul: String,
    #[serde(default)]
    pub lokasi: Option<String>,
    pub waktu_mulai: String,
    #[serde(default)]
    pub waktu_selesai: Option<String>,
    #[serde(default)]
    pub deskripsi: Option<String>,
}

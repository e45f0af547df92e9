//! Route table and access control.

use sid_models::Role;

use crate::session::AuthContext;

/// Every screen of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    // Public
    Home,
    Profil,
    StrukturPemerintahan,
    Sejarah,
    VisiMisi,
    Geografis,
    Berita,
    BeritaDetail(String),
    Galeri,
    Pengumuman,
    Agenda,
    Auth,
    Privacy,
    Terms,
    // Signed-in
    Dashboard,
    Penduduk,
    Keluarga,
    Formulir,
    FormulirData(String),
    Surat,
    ArsipSurat,
    // Admin only
    Wilayah,
    Konten,
    Pengguna,
}

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Public,
    Authenticated,
    Admin,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// Not signed in; send to the login screen.
    RequiresLogin,
    /// Signed in without the needed role; show the access-denied view.
    Forbidden,
}

impl Route {
    /// Parse a path such as `/admin/formulir/abc` or `/berita/judul-berita`.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["profil"] => Route::Profil,
            ["struktur-pemerintahan"] => Route::StrukturPemerintahan,
            ["sejarah"] => Route::Sejarah,
            ["visi-misi"] => Route::VisiMisi,
            ["geografis"] => Route::Geografis,
            ["berita"] => Route::Berita,
            ["berita", slug] => Route::BeritaDetail(slug.to_string()),
            ["galeri"] => Route::Galeri,
            ["pengumuman"] => Route::Pengumuman,
            ["agenda"] => Route::Agenda,
            ["auth"] => Route::Auth,
            ["privacy"] => Route::Privacy,
            ["terms"] => Route::Terms,
            ["admin"] | ["admin", "dashboard"] => Route::Dashboard,
            ["admin", "penduduk"] => Route::Penduduk,
            ["admin", "keluarga"] => Route::Keluarga,
            ["admin", "formulir"] => Route::Formulir,
            ["admin", "formulir", id] => Route::FormulirData(id.to_string()),
            ["admin", "surat"] => Route::Surat,
            ["admin", "arsip-surat"] => Route::ArsipSurat,
            ["admin", "wilayah"] => Route::Wilayah,
            ["admin", "konten"] => Route::Konten,
            ["admin", "pengguna"] => Route::Pengguna,
            _ => return None,
        };
        Some(route)
    }

    pub fn access_level(&self) -> AccessLevel {
        match self {
            Route::Home
            | Route::Profil
            | Route::StrukturPemerintahan
            | Route::Sejarah
            | Route::VisiMisi
            | Route::Geografis
            | Route::Berita
            | Route::BeritaDetail(_)
            | Route::Galeri
            | Route::Pengumuman
            | Route::Agenda
            | Route::Auth
            | Route::Privacy
            | Route::Terms => AccessLevel::Public,
            Route::Dashboard
            | Route::Penduduk
            | Route::Keluarga
            | Route::Formulir
            | Route::FormulirData(_)
            | Route::Surat
            | Route::ArsipSurat => AccessLevel::Authenticated,
            Route::Wilayah | Route::Konten | Route::Pengguna => AccessLevel::Admin,
        }
    }
}

/// Decide whether the current session may open `route`.
pub fn authorize(route: &Route, auth: &AuthContext) -> Access {
    match route.access_level() {
        AccessLevel::Public => Access::Allowed,
        AccessLevel::Authenticated if auth.is_authenticated() => Access::Allowed,
        AccessLevel::Admin => match auth.role() {
            None => Access::RequiresLogin,
            Some(Role::Admin) => Access::Allowed,
            Some(_) => Access::Forbidden,
        },
        AccessLevel::Authenticated => Access::RequiresLogin,
    }
}

//! Closed-set location-region codes used by the narrative extractor.
//!
//! The extractor may only emit codes from this set; anything else is
//! rejected at parse time, which keeps the region filter from matching
//! on invented values.

use serde::{Deserialize, Serialize};

/// A Mexican state code as stored in the knowledge base.
///
/// The serialized form is the three-letter internal code, which does not
/// always match the postal standard (`CHI`, `MXC`, `VCZ` are inherited
/// from the upstream catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateCode {
    /// Hidalgo
    HGO,
    /// Quintana Roo
    ROO,
    /// Nayarit
    NAY,
    /// Baja California Sur
    BCS,
    /// Guanajuato Area
    GTO,
    /// Tabasco
    TAB,
    /// Baja California
    BCN,
    /// Yucatan
    YUC,
    /// Estado de Mexico
    EMX,
    /// Chihuahua
    CHI,
    /// Jalisco
    JAL,
    /// Mexico Area
    MXC,
    /// Veracruz Area
    VCZ,
    /// Campeche Area
    CAM,
    /// Puebla Area
    PBL,
    /// Queretaro Area
    QRO,
    /// Oaxaca
    OAX,
    /// Michoacan
    MCH,
    /// Chiapas
    CHP,
    /// Tlaxcala Area
    TLX,
    /// Sinaloa
    SIN,
    /// Aguascalientes
    AGS,
    /// Coahuila
    COA,
    /// Colima
    COL,
    /// Durango
    DGO,
    /// Guerrero
    GRO,
    /// Morelos
    MOR,
    /// Nuevo León
    NLE,
    /// San Luis Potosí
    SLP,
    /// Sonora
    SON,
    /// Tamaulipas
    TMS,
    /// Zacatecas
    ZAC,
}

impl StateCode {
    /// The destination name this code matches against in the catalog.
    #[must_use]
    pub const fn state_name(self) -> &'static str {
        match self {
            Self::HGO => "Hidalgo",
            Self::ROO => "Quintana Roo",
            Self::NAY => "Nayarit",
            Self::BCS => "Baja California Sur",
            Self::GTO => "Guanajuato Area",
            Self::TAB => "Tabasco",
            Self::BCN => "Baja California",
            Self::YUC => "Yucatan",
            Self::EMX => "Estado de Mexico",
            Self::CHI => "Chiuahua",
            Self::JAL => "Jalisco",
            Self::MXC => "Mexico Area",
            Self::VCZ => "Veracruz Area",
            Self::CAM => "Campeche Area",
            Self::PBL => "Puebla Area",
            Self::QRO => "Queretaro Area",
            Self::OAX => "Oaxaca",
            Self::MCH => "Michoacan",
            Self::CHP => "Chiapas",
            Self::TLX => "Tlaxcala Area",
            Self::SIN => "Sinaloa",
            Self::AGS => "Aguascalientes",
            Self::COA => "Coahuila",
            Self::COL => "Colima",
            Self::DGO => "Durango",
            Self::GRO => "Guerrero",
            Self::MOR => "Morelos",
            Self::NLE => "Nuevo León",
            Self::SLP => "San Luis Potosí",
            Self::SON => "Sonora",
            Self::TMS => "Tamaulipas",
            Self::ZAC => "Zacatecas",
        }
    }

    /// The three-letter code string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HGO => "HGO",
            Self::ROO => "ROO",
            Self::NAY => "NAY",
            Self::BCS => "BCS",
            Self::GTO => "GTO",
            Self::TAB => "TAB",
            Self::BCN => "BCN",
            Self::YUC => "YUC",
            Self::EMX => "EMX",
            Self::CHI => "CHI",
            Self::JAL => "JAL",
            Self::MXC => "MXC",
            Self::VCZ => "VCZ",
            Self::CAM => "CAM",
            Self::PBL => "PBL",
            Self::QRO => "QRO",
            Self::OAX => "OAX",
            Self::MCH => "MCH",
            Self::CHP => "CHP",
            Self::TLX => "TLX",
            Self::SIN => "SIN",
            Self::AGS => "AGS",
            Self::COA => "COA",
            Self::COL => "COL",
            Self::DGO => "DGO",
            Self::GRO => "GRO",
            Self::MOR => "MOR",
            Self::NLE => "NLE",
            Self::SLP => "SLP",
            Self::SON => "SON",
            Self::TMS => "TMS",
            Self::ZAC => "ZAC",
        }
    }
}

impl std::fmt::Display for StateCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Built-in table of monitored locations: the 27 Brazilian state capitals.

use crate::types::Location;

const CAPITALS: &[(&str, f64, f64)] = &[
    ("Aracaju", -10.9091, -37.0677),
    ("Belém", -1.4558, -48.5044),
    ("Belo Horizonte", -19.9167, -43.9345),
    ("Boa Vista", 2.8197, -60.6714),
    ("Brasília", -15.7942, -47.8822),
    ("Campo Grande", -20.4428, -54.6464),
    ("Cuiabá", -15.6014, -56.0979),
    ("Curitiba", -25.4284, -49.2733),
    ("Florianópolis", -27.5954, -48.5480),
    ("Fortaleza", -3.7172, -38.5433),
    ("Goiânia", -16.6864, -49.2643),
    ("João Pessoa", -7.1150, -34.8631),
    ("Macapá", 0.0349, -51.0694),
    ("Maceió", -9.5713, -36.7820),
    ("Manaus", -3.1190, -60.0217),
    ("Natal", -5.7945, -35.2110),
    ("Palmas", -10.1844, -48.3336),
    ("Porto Alegre", -30.0346, -51.2177),
    ("Porto Velho", -8.7619, -63.9039),
    ("Recife", -8.0476, -34.8770),
    ("Rio Branco", -9.9747, -67.8100),
    ("Rio de Janeiro", -22.9068, -43.1729),
    ("Salvador", -12.9714, -38.5014),
    ("São Luís", -2.5387, -44.2825),
    ("São Paulo", -23.5505, -46.6333),
    ("Teresina", -5.0892, -42.8019),
    ("Vitória", -20.3155, -40.3128),
];

/// Returns the built-in location table in its fixed iteration order.
pub fn brazilian_capitals() -> Vec<Location> {
    CAPITALS
        .iter()
        .map(|(city, lat, lon)| Location::new(*city, *lat, *lon))
        .collect()
}

//! Category mapping: free-text class/species strings to canonical names.

/// Ordered phrase → category table. Matching is case-insensitive substring,
/// first entry wins, so more specific phrases come before generic ones.
const TABELA: &[(&str, &str)] = &[
    ("MÁQUINAS, INSTALAÇÕES E UTENSÍLIOS", "MÁQUINAS E UTENSÍLIOS"),
    ("MICROCOMPUTADOR", "EQUIPAMENTOS DE INFORMÁTICA"),
    ("COMPUTADOR", "EQUIPAMENTOS DE INFORMÁTICA"),
    ("NOTEBOOK", "EQUIPAMENTOS DE INFORMÁTICA"),
    ("MONITOR", "EQUIPAMENTOS DE INFORMÁTICA"),
    ("IMPRESSORA", "EQUIPAMENTOS DE INFORMÁTICA"),
    ("ESTABILIZADOR", "EQUIPAMENTOS DE INFORMÁTICA"),
    ("NOBREAK", "EQUIPAMENTOS DE INFORMÁTICA"),
    ("PROJETOR", "EQUIPAMENTOS AUDIOVISUAIS"),
    ("TELEVISOR", "EQUIPAMENTOS AUDIOVISUAIS"),
    ("CAIXA DE SOM", "EQUIPAMENTOS AUDIOVISUAIS"),
    ("AR CONDICIONADO", "EQUIPAMENTOS DE CLIMATIZAÇÃO"),
    ("VENTILADOR", "EQUIPAMENTOS DE CLIMATIZAÇÃO"),
    ("GELADEIRA", "ELETRODOMÉSTICOS"),
    ("REFRIGERADOR", "ELETRODOMÉSTICOS"),
    ("BEBEDOURO", "ELETRODOMÉSTICOS"),
    ("FOGÃO", "ELETRODOMÉSTICOS"),
    ("MICROONDAS", "ELETRODOMÉSTICOS"),
    ("CADEIRA", "MOBILIÁRIO"),
    ("MESA", "MOBILIÁRIO"),
    ("ARMÁRIO", "MOBILIÁRIO"),
    ("ESTANTE", "MOBILIÁRIO"),
    ("ARQUIVO", "MOBILIÁRIO"),
    ("LONGARINA", "MOBILIÁRIO"),
    ("VEÍCULO", "VEÍCULOS"),
    ("AUTOMÓVEL", "VEÍCULOS"),
    ("MOBILIÁRIO EM GERAL", "MOBILIÁRIO"),
    ("EQUIPAMENTOS DE PROCESSAMENTO DE DADOS", "EQUIPAMENTOS DE INFORMÁTICA"),
];

/// Map a free-text class or species string to a canonical category name.
///
/// Falls back to the input unchanged when no phrase matches: every record
/// ends up with a non-empty category, possibly a free-text one that the
/// normalization stage consolidates later.
pub fn map_categoria(texto: &str) -> String {
    let lower = texto.to_lowercase();
    for (frase, categoria) in TABELA {
        if lower.contains(&frase.to_lowercase()) {
            return (*categoria).to_string();
        }
    }
    texto.to_string()
}

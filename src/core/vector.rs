//! Operações vetoriais usadas pelas camadas de similaridade semântica.

/// Similaridade cosseno entre dois vetores.
///
/// Retorna `0.0` para vetores vazios, de tamanhos diferentes ou de norma zero.
/// Os embeddings já saem L2-normalizados do embedder, mas os fakes de teste
/// e eventuais backends externos não têm essa garantia.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Softmax com temperatura. Temperaturas baixas acentuam o vencedor.
pub fn softmax(scores: &[f32], temperature: f32) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let t = temperature.max(1e-6);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| ((s - max) / t).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

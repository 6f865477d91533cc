use std::sync::OnceLock;

use pemseal_crypto::{ChunkCipher, KeyLifecycleManager, KeyPair};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn key_pair(bits: usize) -> &'static KeyPair {
    static K2048: OnceLock<KeyPair> = OnceLock::new();
    static K4096: OnceLock<KeyPair> = OnceLock::new();
    let cell = if bits == 2048 { &K2048 } else { &K4096 };
    cell.get_or_init(|| {
        KeyLifecycleManager::default()
            .generate_key_pair(bits, 65537)
            .unwrap()
    })
}

#[divan::bench(args = [2048, 4096])]
fn bench_encrypt_chunk(bencher: divan::Bencher, bits: usize) {
    let cipher = ChunkCipher::for_encryption(key_pair(bits).public_key().clone());
    let data = make_data(cipher.max_plaintext_len());
    bencher
        .counter(divan::counter::BytesCount::new(data.len()))
        .bench(|| cipher.encrypt_chunk(divan::black_box(&data)).unwrap());
}

#[divan::bench(args = [2048, 4096])]
fn bench_decrypt_chunk(bencher: divan::Bencher, bits: usize) {
    let pair = key_pair(bits);
    let encryptor = ChunkCipher::for_encryption(pair.public_key().clone());
    let decryptor = ChunkCipher::for_decryption(pair.private_key().clone());
    let data = make_data(encryptor.max_plaintext_len());
    let encrypted = encryptor.encrypt_chunk(&data).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(data.len()))
        .bench(|| decryptor.decrypt_chunk(divan::black_box(&encrypted)).unwrap());
}

fn main() {
    divan::main();
}

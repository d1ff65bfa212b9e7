//! End-to-end integration test for the full stacked pipeline: compressor on
//! top of cipher on top of slice layer on top of local files, and the
//! reverse on read, exactly as `lib.rs` describes ("slice(cipher(compress
//! (local)))").
//!
//! Individual layers already get scenario coverage as `#[cfg(test)]` units
//! next to their own code (§8 concrete scenarios 1-6); this file is the one
//! place the full stack is driven together against real files on disk.

#![cfg(all(feature = "lzma", feature = "aes"))]

use slicevault::cipher::{CipherAlgorithm, CipherOptions, CipherReader, CipherWriter, Password};
use slicevault::codec::Algorithm;
use slicevault::codec::stream::{CompressorStream, DecompressorStream};
use slicevault::hash_sink::HashAlgorithm;
use slicevault::slice::{SliceConfig, SliceReader, SliceWriter};
use slicevault::stream::Stream;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn full_stack_round_trips_through_slices_cipher_and_compression() {
    let dir = tempfile::tempdir().unwrap();
    let config = SliceConfig::sliced(dir.path(), "archive", "dar", 4096, 4096)
        .with_hash(HashAlgorithm::Sha1);

    let password = Password::new("correct horse battery staple");
    let cipher_options = CipherOptions::new(CipherAlgorithm::Aes256).clear_block_size(1024);

    let plaintext = sample(20_000);

    // Write path: producer -> compressor -> cipher -> slice -> local files.
    let slice_writer = SliceWriter::create(config.clone());
    let cipher_writer = CipherWriter::new(slice_writer, &password, &cipher_options).unwrap();
    let codec = Algorithm::Xz.block_codec(6).unwrap();
    let mut compressor = CompressorStream::new(cipher_writer, codec, 8192);
    compressor.write(&plaintext).unwrap();
    let cipher_writer = compressor.finish().unwrap();
    let slice_writer = cipher_writer.finish().unwrap();
    let slice_count = slice_writer.finish().unwrap();
    assert!(slice_count >= 1);

    // Read path reverses the stack exactly.
    let slice_reader = SliceReader::open(config).unwrap();
    let cipher_reader = CipherReader::new(slice_reader, &password, &cipher_options).unwrap();
    let codec = Algorithm::Xz.block_codec(6).unwrap();
    let mut decompressor = DecompressorStream::new(cipher_reader, codec);

    let mut recovered = vec![0u8; plaintext.len()];
    decompressor.read_exact(&mut recovered).unwrap();
    assert_eq!(recovered, plaintext);
}

#[test]
fn hash_sidecars_exist_for_every_slice_in_the_full_stack() {
    let dir = tempfile::tempdir().unwrap();
    let config = SliceConfig::sliced(dir.path(), "vault", "bin", 2048, 2048)
        .with_hash(HashAlgorithm::Sha1);

    let password = Password::new("hunter2");
    let cipher_options = CipherOptions::new(CipherAlgorithm::Blowfish).clear_block_size(512);

    let plaintext = sample(10_000);

    let slice_writer = SliceWriter::create(config.clone());
    let mut cipher_writer = CipherWriter::new(slice_writer, &password, &cipher_options).unwrap();
    cipher_writer.write(&plaintext).unwrap();
    let slice_writer = cipher_writer.finish().unwrap();
    let slice_count = slice_writer.finish().unwrap();
    assert!(slice_count > 1, "expected multiple slices for this layout/input size");

    for n in 1..=slice_count {
        let data_path = dir.path().join(format!("vault.{n}.bin"));
        let sidecar_path = dir.path().join(format!("vault.{n}.bin.sha1"));
        assert!(data_path.exists(), "missing slice file {data_path:?}");
        assert!(sidecar_path.exists(), "missing hash sidecar {sidecar_path:?}");
        let sidecar = std::fs::read_to_string(&sidecar_path).unwrap();
        assert!(sidecar.ends_with(&format!("  vault.{n}.bin\n")));
    }

    let slice_reader = SliceReader::open(config).unwrap();
    let mut cipher_reader = CipherReader::new(slice_reader, &password, &cipher_options).unwrap();
    let mut recovered = vec![0u8; plaintext.len()];
    cipher_reader.read_exact(&mut recovered).unwrap();
    assert_eq!(recovered, plaintext);
}

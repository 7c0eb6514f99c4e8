use cloister_envelope::{codec, compress, Cryptor};
use proptest::prelude::*;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(f)
}

proptest! {
    #[test]
    fn encrypt_decrypt_text_round_trips(
        plaintext in ".{0,512}",
        password in ".{1,64}",
    ) {
        let ct = block_on(Cryptor::encrypt_text(&plaintext, &password)).unwrap();
        let pt = block_on(Cryptor::decrypt_text(&ct, &password)).unwrap();
        prop_assert_eq!(pt, plaintext);
    }

    #[test]
    fn sign_strip_round_trips(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let signed = codec::sign(&body);
        prop_assert!(codec::has_valid_signature(&signed));
        prop_assert_eq!(codec::strip_signature(&signed).unwrap(), body.as_slice());
    }

    #[test]
    fn compress_decompress_round_trips(text in ".{0,1024}") {
        let blob = compress::compress_text(&text);
        prop_assert_eq!(compress::decompress_text(&blob).unwrap(), text);
    }
}

#[test]
fn wrong_password_never_succeeds() {
    let ct = block_on(Cryptor::encrypt_text("secret", "right-password")).unwrap();
    assert!(block_on(Cryptor::decrypt_text(&ct, "wrong-password")).is_err());
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use gridtrust::cert::Cert;
use gridtrust::crl::Crl;
use gridtrust::dn::DistinguishedName;
use gridtrust::namespace::NamespacePolicy;

fuzz_target!(|data: &[u8]| {
    let (which, data) = match data.split_first() {
        Some((first, data)) => (*first, data),
        None => return,
    };

    match which % 6 {
        0 => { let _ = Cert::decode(data); },
        1 => { let _ = Crl::decode(data); },
        2 => { let _ = DistinguishedName::decode(data); },
        3 => {
            let text = String::from_utf8_lossy(data);
            let _ = NamespacePolicy::parse_namespaces(
                &text, &DistinguishedName::default()
            );
        }
        4 => {
            let text = String::from_utf8_lossy(data);
            let _ = NamespacePolicy::parse_signing_policy(&text);
        }
        5 => {
            let text = String::from_utf8_lossy(data);
            let _ = DistinguishedName::from_rfc2253(&text);
            let _ = DistinguishedName::from_x500(&text);
        }
        _ => panic!("what?"),
    }
});

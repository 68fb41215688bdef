use super::types::{ChildId, WadName};

pub fn is_untextured(name: WadName) -> bool {
    name.is_empty() || (name[0] == b'-' && name[1] == b'\0')
}

pub fn is_subsector(id: ChildId) -> bool {
    id & 0x8000 != 0
}

pub fn subsector_index(id: ChildId) -> usize {
    usize::from(id & 0x7fff)
}

#[cfg(test)]
mod test {
    use super::{is_subsector, is_untextured, subsector_index};
    use crate::types::WadName;

    #[test]
    fn test_untextured() {
        assert!(is_untextured(WadName::default()));
        assert!(is_untextured(WadName::from_bytes(b"-").unwrap()));
        assert!(!is_untextured(WadName::from_bytes(b"-A").unwrap()));
        assert!(!is_untextured(WadName::from_bytes(b"STARTAN3").unwrap()));
    }

    #[test]
    fn test_child_ids() {
        assert!(is_subsector(0x8003));
        assert_eq!(subsector_index(0x8003), 3);
        assert!(!is_subsector(0x7fff));
        assert_eq!(subsector_index(0xffff), 0x7fff);
    }
}

use serde::Serialize;

/// Reference entry for a tracked congener
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compound {
    pub id: &'static str,
    pub name: &'static str,
    pub sdf_url: &'static str,
    pub risk: &'static str,
    pub organ: &'static str,
}

pub static COMPOUNDS: [Compound; 6] = [
    Compound {
        id: "PCB-118",
        name: "PCB 118",
        sdf_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/35823/SDF",
        risk: "Moderate",
        organ: "Liver",
    },
    Compound {
        id: "PCB-153",
        name: "PCB 153",
        sdf_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/name/PCB-153/SDF",
        risk: "High",
        organ: "Nervous system",
    },
    Compound {
        id: "PCB-180",
        name: "PCB 180",
        sdf_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/37036/SDF",
        risk: "High",
        organ: "Endocrine system",
    },
    Compound {
        id: "PCB-138",
        name: "PCB 138",
        sdf_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/37035/SDF",
        risk: "Moderate",
        organ: "Reproductive system",
    },
    Compound {
        id: "PCB-170",
        name: "PCB 170",
        sdf_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/37037/SDF",
        risk: "High",
        organ: "Immune system",
    },
    Compound {
        id: "PCB-126",
        name: "PCB 126",
        sdf_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/63090/SDF",
        risk: "Very High",
        organ: "Skin and Liver",
    },
];

pub fn find_compound(id: &str) -> Option<&'static Compound> {
    COMPOUNDS.iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_compound_ignores_case() {
        let compound = find_compound("pcb-126").unwrap();
        assert_eq!(compound.risk, "Very High");
        assert!(find_compound("PCB-999").is_none());
    }
}

//! Prompt wording per document class.
//!
//! Prompts are in Portuguese, the language of the documents.

/// Decimal convention. Part of every template.
pub const DECIMAL_RULE: &str = "Use formato decimal com ponto: 1234.56. Converta valores do documento \
     como 1.234,56 para 1234.56 (sem separador de milhar, ponto como separador decimal).";

/// Meaning of the `_COL1`/`_COL2` suffixes.
pub const TWO_COLUMN_RULE: &str = "Campos terminados em _COL1 recebem a quantidade ou referência \
     (horas, dias, percentual); campos terminados em _COL2 recebem o valor monetário da mesma linha.";

pub const EMPTY_RULE: &str = "Se não encontrar um campo, deixe o valor vazio (\"\"). Não invente valores.";

pub const JSON_ONLY: &str = "RETORNE APENAS ESTE JSON, preenchido, sem explicações:";

pub const TEXT_INTRO: &str = "Agora extraia os dados do documento a seguir:";

/// One input/output pair shown to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkedExample {
    pub input: &'static str,
    pub output: &'static str,
}

/// Fixed wording for one document class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub intro: &'static str,
    pub rules: Vec<&'static str>,
    pub examples: Vec<WorkedExample>,
}

const PAYROLL_EXAMPLES: &[WorkedExample] = &[
    WorkedExample {
        input: "001 SALARIO 30,00 5.000,00",
        output: r#"{"SALARIO_COL1": "30.00", "SALARIO_COL2": "5000.00"}"#,
    },
    WorkedExample {
        input: "310 INSS 11,00 550,00",
        output: r#"{"INSS_COL1": "11.00", "INSS_COL2": "550.00"}"#,
    },
    WorkedExample {
        input: "TOTAL DE VENCIMENTOS 5.000,00  TOTAL DE DESCONTOS 750,50  LIQUIDO A RECEBER 4.249,50",
        output: r#"{"TOTAL_BRUTO": "5000.00", "TOTAL_DESCONTOS": "750.50", "VALOR_LIQUIDO": "4249.50"}"#,
    },
];

const INVOICE_EXAMPLES: &[WorkedExample] = &[WorkedExample {
    input: "VALOR DO SERVIÇO: R$ 1.000,00  ALIQUOTA(%): 5,00  VALOR DO ISS: R$ 50,00",
    output: r#"{"TOTAL": "1000.00", "VALOR DO ISS": "50.00", "ALIQUOTA(%)": "5.00", "BASE DE CÁLCULO(R$)": "1000.00", "DEDUÇÃO": "", "DESCONTO": "", "QTD.": "", "VALOR DO SERVIÇO": "1000.00", "INSS": "", "PIS": "", "COFINS": "", "CSLL": "", "IRRF": ""}"#,
}];

impl PromptTemplate {
    /// Payroll statement wording.
    pub fn payroll() -> Self {
        Self {
            intro: "Analise este holerite/folha de pagamento e extraia TODOS os dados em JSON estruturado.",
            rules: vec![
                "Encontre cada campo pelo nome (SALARIO, PTS, BOG, INSS, etc.).",
                "Números de código antes do nome de um campo (ex.: 001 SALARIO) são identificadores, \
                 não valores; o valor é o montante que aparece depois do nome do campo.",
                TWO_COLUMN_RULE,
                DECIMAL_RULE,
                EMPTY_RULE,
            ],
            examples: PAYROLL_EXAMPLES.to_vec(),
        }
    }

    /// Service invoice wording.
    pub fn invoice() -> Self {
        Self {
            intro: "Extraia todos os valores monetários do texto de uma nota fiscal de serviço.",
            rules: vec![
                "Use exatamente as chaves do JSON abaixo, sem renomear.",
                "ALIQUOTA(%) recebe apenas o número do percentual, sem o símbolo %.",
                DECIMAL_RULE,
                EMPTY_RULE,
            ],
            examples: INVOICE_EXAMPLES.to_vec(),
        }
    }

    /// Wording for schemas without a dedicated template.
    pub fn generic(has_two_column_fields: bool) -> Self {
        let mut rules = Vec::new();
        if has_two_column_fields {
            rules.push(TWO_COLUMN_RULE);
        }
        rules.extend([DECIMAL_RULE, EMPTY_RULE]);
        Self {
            intro: "Extraia os campos abaixo deste documento em JSON estruturado.",
            rules,
            examples: Vec::new(),
        }
    }
}

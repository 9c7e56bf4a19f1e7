//! Built-in rule sets.

use lintwork_core::{Priority, RuleDefinition, RuleSetDefinition};

fn rule(id: &str, priority: u8, description: &str) -> RuleDefinition {
    // table values below are all in 1..=5
    let priority = Priority::new(i64::from(priority)).unwrap_or(Priority::MEDIUM);
    RuleDefinition::new(id, priority).with_description(description)
}

/// Names of all built-in sets, in catalog order.
pub const SET_NAMES: &[&str] = &[
    "bestpractices",
    "codestyle",
    "design",
    "documentation",
    "errorprone",
    "multithreading",
    "performance",
    "security",
];

/// Returns every built-in set.
#[must_use]
pub fn all_sets() -> Vec<RuleSetDefinition> {
    vec![
        best_practices(),
        code_style(),
        design(),
        documentation(),
        error_prone(),
        multithreading(),
        performance(),
        security(),
    ]
}

/// `errorprone`: constructs that are likely bugs.
#[must_use]
pub fn error_prone() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "errorprone",
        "Broken, confusing or runtime-error-prone constructs",
        vec![
            rule("AssignmentInOperand", 3, "Assignment inside an operand"),
            rule(
                "AvoidBranchingStatementAsLastInLoop",
                2,
                "Loop whose last statement is break/continue/return",
            ),
            rule("AvoidCatchingNPE", 3, "Catching NullPointerException"),
            rule("AvoidCatchingThrowable", 3, "Catching Throwable"),
            rule(
                "AvoidDecimalLiteralsInBigDecimalConstructor",
                3,
                "BigDecimal built from a floating-point literal",
            ),
            rule("AvoidMultipleUnaryOperators", 2, "Stacked unary operators"),
            rule("CloseResource", 3, "Resource not closed after use")
                .with_property("types", "java.lang.AutoCloseable,java.sql.Connection"),
            rule("CompareObjectsWithEquals", 3, "Objects compared with =="),
            rule("EmptyCatchBlock", 3, "Catch block that ignores the exception")
                .with_property("allowCommentedBlocks", "false")
                .with_message("Avoid empty catch blocks"),
            rule("EqualsNull", 1, "equals(null) instead of == null"),
            rule("JumbledIncrementer", 3, "Inner loop increments the outer counter"),
            rule("MisplacedNullCheck", 3, "Null check after the value was used"),
            rule("ReturnFromFinallyBlock", 3, "Return inside a finally block"),
            rule("UseEqualsToCompareStrings", 3, "Strings compared with =="),
        ],
    )
}

/// `bestpractices`: generally accepted best practices.
#[must_use]
pub fn best_practices() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "bestpractices",
        "Generally accepted best practices",
        vec![
            rule("AvoidPrintStackTrace", 3, "printStackTrace instead of a logger"),
            rule("AvoidReassigningParameters", 2, "Method parameter reassigned"),
            rule("ForLoopCanBeForeach", 3, "Indexed loop that could be for-each"),
            rule("LooseCoupling", 3, "Implementation type used in a declaration"),
            rule("MissingOverride", 3, "Overriding method without @Override"),
            rule("SwitchStmtsShouldHaveDefault", 3, "Switch without default"),
            rule("SystemPrintln", 2, "System.out/err used for output"),
            rule("UnusedFormalParameter", 3, "Parameter never read"),
            rule("UnusedLocalVariable", 3, "Local variable never read"),
            rule("UnusedPrivateField", 3, "Private field never read"),
            rule("UnusedPrivateMethod", 3, "Private method never called"),
        ],
    )
}

/// `codestyle`: naming and formatting conventions.
#[must_use]
pub fn code_style() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "codestyle",
        "Coding style conventions",
        vec![
            rule("ClassNamingConventions", 1, "Class name does not match the pattern")
                .with_property("classPattern", "[A-Z][a-zA-Z0-9]*"),
            rule("ControlStatementBraces", 3, "Control statement without braces"),
            rule("FieldNamingConventions", 1, "Field name does not match the pattern"),
            rule("LocalVariableNamingConventions", 1, "Local name does not match the pattern"),
            rule("LongVariable", 3, "Variable name is too long")
                .with_property("minimum", "17"),
            rule("MethodNamingConventions", 1, "Method name does not match the pattern"),
            rule("ShortVariable", 3, "Variable name is too short")
                .with_property("minimum", "3"),
            rule("UnnecessaryImport", 4, "Import that is unused or duplicated"),
            rule("UselessParentheses", 4, "Parentheses that change nothing"),
        ],
    )
}

/// `design`: structural problems.
#[must_use]
pub fn design() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "design",
        "Design problems",
        vec![
            rule("AvoidDeeplyNestedIfStmts", 3, "If statements nested too deeply")
                .with_property("problemDepth", "3"),
            rule("CognitiveComplexity", 3, "Method is hard to understand")
                .with_property("reportLevel", "15"),
            rule("CyclomaticComplexity", 3, "Method has too many paths")
                .with_property("methodReportLevel", "10"),
            rule("ExcessiveParameterList", 3, "Too many parameters")
                .with_property("minimum", "10"),
            rule("GodClass", 3, "Class that does too much"),
            rule("ImmutableField", 3, "Private field that could be final"),
            rule("SimplifyBooleanReturns", 3, "If/else returning boolean literals"),
            rule("TooManyFields", 3, "Class with too many fields")
                .with_property("maxfields", "15"),
        ],
    )
}

/// `documentation`: comment requirements.
#[must_use]
pub fn documentation() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "documentation",
        "Code documentation",
        vec![
            rule("CommentRequired", 3, "Public element without a comment"),
            rule("CommentSize", 3, "Comment is too long")
                .with_property("maxLines", "6"),
            rule("UncommentedEmptyConstructor", 3, "Empty constructor without a comment"),
            rule("UncommentedEmptyMethodBody", 3, "Empty method without a comment"),
        ],
    )
}

/// `multithreading`: concurrency hazards.
#[must_use]
pub fn multithreading() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "multithreading",
        "Issues with multiple threads of execution",
        vec![
            rule("AvoidSynchronizedAtMethodLevel", 3, "synchronized on a method"),
            rule("AvoidThreadGroup", 3, "ThreadGroup is not thread-safe"),
            rule("DoNotUseThreads", 3, "Raw threads in managed environments"),
            rule("DoubleCheckedLocking", 1, "Broken double-checked locking"),
            rule("NonThreadSafeSingleton", 3, "Lazy singleton without synchronization"),
            rule("UnsynchronizedStaticFormatter", 3, "Shared static formatter"),
        ],
    )
}

/// `performance`: inefficient code.
#[must_use]
pub fn performance() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "performance",
        "Suboptimal code",
        vec![
            rule("AddEmptyString", 3, "Conversion by appending an empty string"),
            rule("AvoidInstantiatingObjectsInLoops", 3, "New object in every iteration"),
            rule("BigIntegerInstantiation", 3, "new BigInteger for a cached constant"),
            rule("InefficientStringBuffering", 3, "Concatenation inside append"),
            rule("UseIndexOfChar", 3, "indexOf with a one-character string"),
            rule("UseStringBufferForStringAppends", 3, "String += in a loop"),
        ],
    )
}

/// `security`: potential vulnerabilities.
#[must_use]
pub fn security() -> RuleSetDefinition {
    RuleSetDefinition::new(
        "security",
        "Potential security flaws",
        vec![
            rule("HardCodedCryptoKey", 3, "Cryptographic key in source code"),
            rule("InsecureCryptoIv", 3, "Hard-coded initialization vector"),
        ],
    )
}
